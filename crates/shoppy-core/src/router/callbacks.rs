//! Inline-button presses.

use crate::{
    access::Operation,
    actions::{CallbackAction, ListAction, ManageScreen, MemberAction},
    conversation::{Conversation, ConversationState, ReturnTo},
    domain::{ItemId, ListId, UserId},
    formatting::format_activity_log,
    models::{ActionKind, Item, ShoppingList, User},
    screens,
    Result,
};

use super::{Reply, Router};

const NO_LIST: &str = "No list selected";
const ACCESS_DENIED: &str = "Access denied";
const ITEM_NOT_FOUND: &str = "Item not found";

impl Router {
    pub(super) async fn on_callback(&self, user: &User, action: CallbackAction) -> Result<Reply> {
        match action {
            CallbackAction::Noop => Ok(Reply::none()),
            CallbackAction::Unknown => Ok(Reply::toast("Unknown action")),
            CallbackAction::ListsPage(page) => Ok(Reply::edit(self.lists_screen(user, page).await?)),
            CallbackAction::SelectList(list_id) => self.select_list(user, list_id).await,
            CallbackAction::List(ListAction::New) => {
                self.prompt(
                    user,
                    ConversationState::WaitingForListName,
                    ReturnTo::ListsOverview,
                    "📝 Enter the name for your new list:".to_string(),
                )
                .await
            }
            CallbackAction::List(action) => {
                let Some(list) = self.current_list(user).await? else {
                    return Ok(Reply::toast(NO_LIST));
                };
                self.list_action(user, list, action).await
            }
            CallbackAction::Member(action, target) => {
                let Some(list) = self.current_list(user).await? else {
                    return Ok(Reply::toast(NO_LIST));
                };
                self.member_action(user, &list, action, target).await
            }
            CallbackAction::ToggleItem(item) => self.toggle_item(user, item).await,
            CallbackAction::ToggleVisibility(item) => self.toggle_visibility(user, item).await,
            other => {
                let Some(list) = self.current_list(user).await? else {
                    return Ok(Reply::toast(NO_LIST));
                };
                self.list_screen(user, &list, other).await
            }
        }
    }

    /// Screens that only need the current list.
    async fn list_screen(
        &self,
        user: &User,
        list: &ShoppingList,
        action: CallbackAction,
    ) -> Result<Reply> {
        let screen = match action {
            CallbackAction::ItemsPage(page) => self.items_screen(list, page).await?,
            CallbackAction::VisibilityPage(page) => self.visibility_screen(list, page).await?,
            CallbackAction::UsersPage(page) => self.members_screen(list, user, page).await?,
            CallbackAction::Manage(ManageScreen::Items) => screens::manage_items(list),
            CallbackAction::Manage(ManageScreen::List) => self.manage_list_screen(list, user).await?,
            CallbackAction::AddItem => {
                return self
                    .prompt(
                        user,
                        ConversationState::WaitingForItemName,
                        ReturnTo::ManageItems,
                        format!("🛒 Enter the item name to add to \"{}\":", list.name),
                    )
                    .await;
            }
            _ => return Ok(Reply::toast("Unknown action")),
        };
        Ok(Reply::edit(screen))
    }

    async fn prompt(
        &self,
        user: &User,
        state: ConversationState,
        return_to: ReturnTo,
        text: String,
    ) -> Result<Reply> {
        self.stores
            .users
            .set_conversation(user.id, &Conversation::waiting(state, return_to))
            .await?;
        Ok(Reply::text(text))
    }

    async fn select_list(&self, user: &User, list_id: ListId) -> Result<Reply> {
        if !self.stores.access.has_access(list_id, user.id).await? {
            return Ok(Reply::toast(ACCESS_DENIED));
        }
        let Some(list) = self.stores.lists.get(list_id).await? else {
            return Ok(Reply::toast(ACCESS_DENIED));
        };
        self.stores.users.set_current_list(user.id, Some(list.id)).await?;
        Ok(Reply::edit(self.items_screen(&list, 0).await?))
    }

    async fn list_action(&self, user: &User, list: ShoppingList, action: ListAction) -> Result<Reply> {
        match action {
            ListAction::Share => {
                if !self
                    .stores
                    .access
                    .check(list.id, user.id, Operation::ShareInvite)
                    .await?
                {
                    return Ok(Reply::toast("Only admins can share"));
                }
                let link = self.settings.invite_link(&list.share_token);
                Ok(Reply::text(format!(
                    "🔗 Share this link to invite others to \"{}\":\n\n{link}",
                    list.name
                ))
                .with_toast("Link generated!"))
            }
            ListAction::Rename => {
                if !self
                    .stores
                    .access
                    .check(list.id, user.id, Operation::RenameList)
                    .await?
                {
                    return Ok(Reply::toast("Only admins can rename"));
                }
                self.prompt(
                    user,
                    ConversationState::WaitingForNewListName,
                    ReturnTo::ManageList,
                    format!("✏️ Enter the new name for \"{}\":", list.name),
                )
                .await
            }
            ListAction::Delete => {
                if !self
                    .stores
                    .access
                    .check(list.id, user.id, Operation::DeleteList)
                    .await?
                {
                    return Ok(Reply::toast("Only admins can delete"));
                }
                Ok(Reply::edit(screens::confirm_delete(&list)))
            }
            ListAction::ConfirmDelete => {
                if !self.stores.lists.delete(list.id, user.id).await? {
                    return Ok(Reply::toast("Only admins can delete"));
                }
                self.stores.users.set_current_list(user.id, None).await?;
                Ok(
                    Reply::edit_text(format!("✅ List \"{}\" has been deleted.", list.name))
                        .with_toast("List deleted!"),
                )
            }
            ListAction::Leave => {
                if list.is_owner(user.id) {
                    return Ok(Reply::toast("Owners cannot leave"));
                }
                if !self.stores.lists.leave(list.id, user.id).await? {
                    return Ok(Reply::toast("Could not leave"));
                }
                let notice = self.record(&list, user, ActionKind::UserLeft, None).await?;
                self.stores.users.set_current_list(user.id, None).await?;
                Ok(Reply::edit_text(format!("✅ You have left \"{}\".", list.name))
                    .with_toast("Left the list")
                    .with_notice(Some(notice)))
            }
            ListAction::Log => {
                let entries = self
                    .stores
                    .activity
                    .recent(list.id, self.settings.activity_view_limit)
                    .await?;
                Ok(Reply::text(format_activity_log(&entries))
                    .then_screen(self.manage_list_screen(&list, user).await?))
            }
            // Handled before a current list is required.
            ListAction::New => Ok(Reply::none()),
        }
    }

    async fn toggle_item(&self, user: &User, item_id: ItemId) -> Result<Reply> {
        let Some(item) = self.stores.items.get(item_id).await? else {
            return Ok(Reply::toast(ITEM_NOT_FOUND));
        };
        let Some(list) = self.accessible_list(user, item.list_id).await? else {
            return Ok(Reply::toast(ACCESS_DENIED));
        };
        self.flip_checked(user, &list, &item).await
    }

    /// Flip the check mark of an item already looked up and authorized.
    async fn flip_checked(&self, user: &User, list: &ShoppingList, item: &Item) -> Result<Reply> {
        let (changed, kind) = if item.is_checked {
            (self.stores.items.uncheck(item.id).await?, ActionKind::ItemUnchecked)
        } else {
            (self.stores.items.check(item.id).await?, ActionKind::ItemChecked)
        };
        // Deleted between the lookup and the update.
        if !changed {
            return Ok(Reply::toast(ITEM_NOT_FOUND));
        }
        let notice = self.record(list, user, kind, Some(item.name.clone())).await?;

        Ok(Reply::edit(self.items_screen_at(list, item.id).await?).with_notice(Some(notice)))
    }

    async fn toggle_visibility(&self, user: &User, item_id: ItemId) -> Result<Reply> {
        let Some(item) = self.stores.items.get(item_id).await? else {
            return Ok(Reply::toast(ITEM_NOT_FOUND));
        };
        let Some(list) = self.accessible_list(user, item.list_id).await? else {
            return Ok(Reply::toast(ACCESS_DENIED));
        };
        self.flip_hidden(user, &list, &item).await
    }

    async fn flip_hidden(&self, user: &User, list: &ShoppingList, item: &Item) -> Result<Reply> {
        let (changed, kind) = if item.is_hidden {
            (self.stores.items.show(item.id).await?, ActionKind::ItemShown)
        } else {
            (self.stores.items.hide(item.id).await?, ActionKind::ItemHidden)
        };
        if !changed {
            return Ok(Reply::toast(ITEM_NOT_FOUND));
        }
        let notice = self.record(list, user, kind, Some(item.name.clone())).await?;

        Ok(Reply::edit(self.visibility_screen_at(list, item.id).await?)
            .with_notice(Some(notice)))
    }

    async fn accessible_list(&self, user: &User, list_id: ListId) -> Result<Option<ShoppingList>> {
        if !self
            .stores
            .access
            .check(list_id, user.id, Operation::EditItems)
            .await?
        {
            return Ok(None);
        }
        self.stores.lists.get(list_id).await
    }

    async fn member_action(
        &self,
        user: &User,
        list: &ShoppingList,
        action: MemberAction,
        target: UserId,
    ) -> Result<Reply> {
        let is_admin = self
            .stores
            .access
            .check(list.id, user.id, Operation::ManageMembers)
            .await?;
        if !is_admin {
            return Ok(Reply::toast(match action {
                MemberAction::Select => "Only admins can manage users",
                _ => "Permission denied",
            }));
        }
        let Some(target) = self.stores.users.get(target).await? else {
            return Ok(Reply::toast("User not found"));
        };

        let (done, kind, verb) = match action {
            MemberAction::Select => {
                let members = self.stores.lists.members(list.id).await?;
                let Some(member) = members.iter().find(|m| m.user.id == target.id) else {
                    return Ok(Reply::toast("User not in list"));
                };
                return Ok(Reply::edit(screens::member_actions(list, member)));
            }
            MemberAction::Promote => (
                self.stores.lists.promote(list.id, user.id, target.id).await?,
                ActionKind::UserPromoted,
                ("Promoted", "promote"),
            ),
            MemberAction::Demote => (
                self.stores.lists.demote(list.id, user.id, target.id).await?,
                ActionKind::UserDemoted,
                ("Demoted", "demote"),
            ),
            MemberAction::Remove => (
                self.stores.lists.remove(list.id, user.id, target.id).await?,
                ActionKind::UserRemoved,
                ("Removed", "remove"),
            ),
        };

        let (past, infinitive) = verb;
        if !done {
            return Ok(Reply::toast(format!("Could not {infinitive}")));
        }
        let notice = self
            .record(list, user, kind, Some(target.display_name.clone()))
            .await?;
        Ok(Reply::edit(self.members_screen(list, user, 0).await?)
            .with_toast(format!("{past} {}!", target.display_name))
            .with_notice(Some(notice)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{ChatId, ListId},
        messaging::fake::Outbound,
        models::Role,
        router::testing::{harness, Harness},
    };

    /// Ann owns "Groceries" with `items`; Bob has joined it.
    async fn shared_list(items: &[&str]) -> (Harness, ListId) {
        let h = harness().await;
        h.say(1, "/newlist Groceries").await;
        for item in items {
            h.say(1, &format!("/add {item}")).await;
        }
        let list_id = h.user(1).await.current_list_id.unwrap();
        let list = h.stores.lists.get(list_id).await.unwrap().unwrap();
        h.say(2, &format!("/start join_{}", list.share_token)).await;
        h.fake.take();
        (h, list_id)
    }

    fn toasts(h: &Harness) -> Vec<Option<String>> {
        h.fake.answers()
    }

    #[tokio::test]
    async fn every_callback_is_answered_once() {
        let (h, _) = shared_list(&["Milk"]).await;
        for data in ["noop", "lists:0", "items:0", "manage:list", "bogus", "list:log"] {
            h.press(1, data).await;
        }
        assert_eq!(toasts(&h).len(), 6);
    }

    #[tokio::test]
    async fn unknown_action_toast() {
        let (h, _) = shared_list(&[]).await;
        h.press(1, "item:toggle:abc").await;
        assert_eq!(
            h.fake.take(),
            vec![Outbound::Answered {
                callback_id: "cb-1".to_string(),
                text: Some("Unknown action".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn lists_page_edits_in_place() {
        let (h, _) = shared_list(&[]).await;
        h.press(2, "lists:0").await;
        let out = h.fake.take();
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Outbound::Edited { text, .. } if text == "📋 Your Lists (1/1)"));
    }

    #[tokio::test]
    async fn select_requires_membership() {
        let (h, list_id) = shared_list(&[]).await;
        h.press(3, &format!("list:select:{}", list_id.0)).await;
        assert_eq!(toasts(&h), vec![Some("Access denied".to_string())]);
        assert_eq!(h.user(3).await.current_list_id, None);
    }

    #[tokio::test]
    async fn select_sets_current_list() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        h.say(2, "/newlist Mine").await;
        h.fake.take();

        h.press(2, &format!("list:select:{}", list_id.0)).await;
        assert_eq!(h.user(2).await.current_list_id, Some(list_id));
        assert_eq!(h.texts(2), vec!["📝 Groceries (1/1)".to_string()]);
    }

    #[tokio::test]
    async fn toggle_checks_logs_and_notifies() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        let milk = h.stores.items.items(list_id, true).await.unwrap()[0].clone();

        h.press(2, &format!("item:toggle:{}", milk.id.0)).await;
        assert!(h.stores.items.get(milk.id).await.unwrap().unwrap().is_checked);
        assert_eq!(
            h.fake.sent_to(ChatId(1)),
            vec!["[Groceries] ✅ Bob checked: Milk".to_string()]
        );
        let edited = h
            .fake
            .all()
            .into_iter()
            .find_map(|o| match o {
                Outbound::Edited { keyboard, .. } => keyboard,
                _ => None,
            })
            .unwrap();
        assert_eq!(edited.rows[0][0].label, "✅ Milk");
        h.fake.take();

        h.press(2, &format!("item:toggle:{}", milk.id.0)).await;
        assert!(!h.stores.items.get(milk.id).await.unwrap().unwrap().is_checked);
        assert_eq!(
            h.fake.sent_to(ChatId(1)),
            vec!["[Groceries] ⬜ Bob unchecked: Milk".to_string()]
        );
    }

    #[tokio::test]
    async fn toggle_stays_on_the_items_page() {
        let names: Vec<String> = (1..=8).map(|i| format!("Item {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (h, list_id) = shared_list(&refs).await;
        let seventh = h.stores.items.items(list_id, true).await.unwrap()[6].clone();

        h.press(1, &format!("item:toggle:{}", seventh.id.0)).await;
        assert_eq!(h.texts(1), vec!["📝 Groceries (2/2)".to_string()]);
    }

    #[tokio::test]
    async fn toggle_rejects_outsiders_and_missing_items() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        let milk = h.stores.items.items(list_id, true).await.unwrap()[0].clone();

        h.press(3, &format!("item:toggle:{}", milk.id.0)).await;
        h.press(1, "item:toggle:9999").await;
        assert_eq!(
            toasts(&h),
            vec![
                Some("Access denied".to_string()),
                Some("Item not found".to_string())
            ]
        );
        assert!(!h.stores.items.get(milk.id).await.unwrap().unwrap().is_checked);
    }

    #[tokio::test]
    async fn item_deleted_before_the_flip_leaves_no_trace() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        let ann = h.user(1).await;
        let list = h.stores.lists.get(list_id).await.unwrap().unwrap();
        let milk = h.stores.items.items(list_id, true).await.unwrap()[0].clone();
        let logged = h.stores.activity.recent(list_id, 50).await.unwrap().len();
        h.stores.items.delete(milk.id).await.unwrap();

        let checked = h.router.flip_checked(&ann, &list, &milk).await.unwrap();
        let hidden = h.router.flip_hidden(&ann, &list, &milk).await.unwrap();
        for reply in [checked, hidden] {
            assert_eq!(reply.toast.as_deref(), Some("Item not found"));
            assert!(reply.effects.is_empty());
            assert!(reply.notice.is_none());
        }
        assert_eq!(
            h.stores.activity.recent(list_id, 50).await.unwrap().len(),
            logged
        );
    }

    #[tokio::test]
    async fn visibility_toggle_is_logged_but_silent() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        let milk = h.stores.items.items(list_id, true).await.unwrap()[0].clone();

        h.press(1, &format!("item:togglevis:{}", milk.id.0)).await;
        assert!(h.stores.items.items(list_id, false).await.unwrap().is_empty());
        assert!(h.fake.sent_to(ChatId(2)).is_empty());

        let log = h.stores.activity.recent(list_id, 1).await.unwrap();
        assert_eq!(log[0].action, crate::models::ActionKind::ItemHidden);
        assert!(h.texts(1)[0].starts_with("👁️ Groceries - All Items (1/1)"));
    }

    #[tokio::test]
    async fn add_item_button_prompts_and_returns_to_manage_items() {
        let (h, list_id) = shared_list(&[]).await;
        h.press(2, "item:add").await;
        h.say(2, "Bread").await;

        assert_eq!(
            h.fake.sent_to(ChatId(2)),
            vec![
                "🛒 Enter the item name to add to \"Groceries\":".to_string(),
                "✅ Added: Bread".to_string(),
                "🛒 Manage Items - Groceries".to_string(),
            ]
        );
        assert_eq!(
            h.fake.sent_to(ChatId(1)),
            vec!["[Groceries] ➕ Bob added: Bread".to_string()]
        );
        assert_eq!(h.stores.items.items(list_id, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_list_button_returns_to_overview() {
        let (h, _) = shared_list(&[]).await;
        h.press(2, "list:new").await;
        h.say(2, "Hardware").await;
        assert_eq!(
            h.fake.sent_to(ChatId(2)),
            vec![
                "📝 Enter the name for your new list:".to_string(),
                "✅ List \"Hardware\" created!".to_string(),
                "📋 Your Lists (1/1)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn share_is_admin_only() {
        let (h, list_id) = shared_list(&[]).await;
        let list = h.stores.lists.get(list_id).await.unwrap().unwrap();

        h.press(2, "list:share").await;
        assert_eq!(toasts(&h), vec![Some("Only admins can share".to_string())]);
        h.fake.take();

        h.press(1, "list:share").await;
        assert_eq!(toasts(&h), vec![Some("Link generated!".to_string())]);
        assert_eq!(
            h.fake.sent_to(ChatId(1)),
            vec![format!(
                "🔗 Share this link to invite others to \"Groceries\":\n\nhttps://t.me/ShoppyBot?start=join_{}",
                list.share_token
            )]
        );
    }

    #[tokio::test]
    async fn member_sees_no_admin_buttons_and_cannot_delete() {
        let (h, list_id) = shared_list(&[]).await;
        h.press(2, "manage:list").await;
        assert!(h.texts(2)[0].ends_with("Your role: Member"));

        h.press(2, "list:delete").await;
        h.press(2, "list:confirmdelete").await;
        assert_eq!(
            toasts(&h),
            vec![
                Some("Only admins can delete".to_string()),
                Some("Only admins can delete".to_string())
            ]
        );
        assert!(h.stores.lists.get(list_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_confirms_then_removes() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        h.press(1, "list:delete").await;
        assert!(h.texts(1)[0].starts_with("⚠️ Are you sure you want to delete \"Groceries\"?"));

        h.press(1, "list:confirmdelete").await;
        assert_eq!(toasts(&h), vec![Some("List deleted!".to_string())]);
        assert_eq!(
            h.texts(1),
            vec!["✅ List \"Groceries\" has been deleted.".to_string()]
        );
        assert!(h.stores.lists.get(list_id).await.unwrap().is_none());
        assert_eq!(h.user(1).await.current_list_id, None);
        assert_eq!(h.user(2).await.current_list_id, None);
    }

    #[tokio::test]
    async fn leave_and_owner_cannot_leave() {
        let (h, list_id) = shared_list(&[]).await;
        h.press(1, "list:leave").await;
        assert_eq!(toasts(&h), vec![Some("Owners cannot leave".to_string())]);
        h.fake.take();

        h.press(2, "list:leave").await;
        assert_eq!(toasts(&h), vec![Some("Left the list".to_string())]);
        assert_eq!(
            h.fake.sent_to(ChatId(1)),
            vec!["[Groceries] 👋 Bob left the list".to_string()]
        );
        let bob = h.user(2).await;
        assert_eq!(bob.current_list_id, None);
        assert_eq!(h.stores.access.role(list_id, bob.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn log_is_sent_then_manage_list() {
        let (h, list_id) = shared_list(&["Milk"]).await;
        let milk = h.stores.items.items(list_id, true).await.unwrap()[0].clone();
        h.clock.advance(chrono::Duration::minutes(135));
        h.press(2, &format!("item:toggle:{}", milk.id.0)).await;
        h.fake.take();

        h.press(1, "list:log").await;
        let texts = h.fake.sent_to(ChatId(1));
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with(
            "📜 Recent Activity:\n\n[03/14 11:45] ✅ Item checked: Milk (Bob)\n[03/14 09:30] 👋 User joined (Bob)"
        ));
        assert!(texts[1].starts_with("⚙️ Manage List - Groceries\nYour role: Owner"));
    }

    #[tokio::test]
    async fn member_management() {
        let (h, list_id) = shared_list(&[]).await;
        let ann = h.user(1).await;
        let bob = h.user(2).await;

        h.press(2, &format!("user:select:{}", ann.id.0)).await;
        h.press(2, &format!("user:promote:{}", ann.id.0)).await;
        h.press(1, "user:select:9999").await;
        assert_eq!(
            toasts(&h),
            vec![
                Some("Only admins can manage users".to_string()),
                Some("Permission denied".to_string()),
                Some("User not found".to_string()),
            ]
        );
        h.fake.take();

        h.press(1, &format!("user:select:{}", bob.id.0)).await;
        assert_eq!(h.texts(1), vec!["👤 Manage User\n\nBob\nRole: 👤 Member".to_string()]);

        h.press(1, &format!("user:promote:{}", bob.id.0)).await;
        assert_eq!(toasts(&h), vec![Some("Promoted Bob!".to_string())]);
        assert!(h.texts(1)[0].starts_with("👥 Groceries - Members (1/1)"));
        assert_eq!(
            h.stores.access.role(list_id, bob.id).await.unwrap(),
            Some(Role::Admin)
        );

        h.press(1, &format!("user:promote:{}", bob.id.0)).await;
        assert_eq!(toasts(&h), vec![Some("Could not promote".to_string())]);
        h.fake.take();

        h.press(2, &format!("user:demote:{}", ann.id.0)).await;
        h.press(2, &format!("user:remove:{}", ann.id.0)).await;
        assert_eq!(
            toasts(&h),
            vec![
                Some("Could not demote".to_string()),
                Some("Could not remove".to_string())
            ]
        );
        h.fake.take();

        h.press(1, &format!("user:remove:{}", bob.id.0)).await;
        assert_eq!(toasts(&h), vec![Some("Removed Bob!".to_string())]);
        assert_eq!(h.stores.access.role(list_id, bob.id).await.unwrap(), None);
        assert!(h.fake.sent_to(ChatId(2)).is_empty());
    }

    #[tokio::test]
    async fn screens_without_current_list() {
        let h = harness().await;
        h.say(3, "/start").await;
        h.fake.take();
        let presses = [
            "items:0",
            "manage:items",
            "users:0",
            "list:share",
            "list:rename",
            "list:delete",
            "list:confirmdelete",
            "list:leave",
            "list:log",
            "item:add",
            "user:select:1",
            "user:promote:1",
            "user:demote:1",
            "user:remove:1",
        ];
        for data in presses {
            h.press(3, data).await;
        }
        assert_eq!(
            toasts(&h),
            vec![Some("No list selected".to_string()); presses.len()]
        );
    }
}
