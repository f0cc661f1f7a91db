//! Completion handlers shared by commands with arguments and answered
//! prompts: create list, add item, rename list.

use crate::{
    conversation::ReturnTo,
    formatting::exceeds,
    models::{ActionKind, ShoppingList, User, MAX_ITEM_NAME_LEN, MAX_LIST_NAME_LEN},
    Result,
};

use super::{Reply, Router};

const EMPTY_NAME: &str = "❌ Name cannot be empty.";

fn check_name(name: &str, max: usize, what: &str) -> Option<Reply> {
    if name.is_empty() {
        return Some(Reply::text(EMPTY_NAME));
    }
    if exceeds(name, max) {
        return Some(Reply::text(format!(
            "❌ {what} name is too long (max {max} characters)."
        )));
    }
    None
}

impl Router {
    pub(super) async fn create_list(
        &self,
        user: &User,
        name: &str,
        return_to: Option<ReturnTo>,
    ) -> Result<Reply> {
        if let Some(rejected) = check_name(name, MAX_LIST_NAME_LEN, "List") {
            return Ok(rejected);
        }

        let list = self.stores.lists.create(user.id, name).await?;
        self.stores.users.set_current_list(user.id, Some(list.id)).await?;
        let notice = self
            .record(&list, user, ActionKind::ListCreated, Some(name.to_string()))
            .await?;

        let next = match return_to {
            Some(ReturnTo::ListsOverview) => self.lists_screen(user, 0).await?,
            _ => self.items_screen(&list, 0).await?,
        };
        Ok(Reply::text(format!("✅ List \"{}\" created!", list.name))
            .then_screen(next)
            .with_notice(Some(notice)))
    }

    pub(super) async fn add_item(
        &self,
        user: &User,
        list: &ShoppingList,
        name: &str,
        return_to: Option<ReturnTo>,
    ) -> Result<Reply> {
        if let Some(rejected) = check_name(name, MAX_ITEM_NAME_LEN, "Item") {
            return Ok(rejected);
        }

        let item = self.stores.items.add(list.id, user.id, name).await?;
        let notice = self
            .record(list, user, ActionKind::ItemAdded, Some(item.name.clone()))
            .await?;

        let next = match return_to {
            Some(ReturnTo::ManageItems) => crate::screens::manage_items(list),
            _ => self.items_screen(list, 0).await?,
        };
        Ok(Reply::text(format!("✅ Added: {}", item.name))
            .then_screen(next)
            .with_notice(Some(notice)))
    }

    pub(super) async fn rename_list(
        &self,
        user: &User,
        list: &ShoppingList,
        name: &str,
        return_to: Option<ReturnTo>,
    ) -> Result<Reply> {
        if let Some(rejected) = check_name(name, MAX_LIST_NAME_LEN, "List") {
            return Ok(rejected);
        }

        if !self.stores.lists.rename(list.id, user.id, name).await? {
            return Ok(Reply::text("❌ Only admins can rename the list."));
        }

        let renamed = ShoppingList {
            name: name.to_string(),
            ..list.clone()
        };
        let notice = self
            .record(
                &renamed,
                user,
                ActionKind::ListRenamed,
                Some(format!("{} → {}", list.name, name)),
            )
            .await?;

        let mut reply = Reply::text(format!("✅ List renamed to \"{name}\""));
        if return_to == Some(ReturnTo::ManageList) {
            reply = reply.then_screen(self.manage_list_screen(&renamed, user).await?);
        }
        Ok(reply.with_notice(Some(notice)))
    }
}
