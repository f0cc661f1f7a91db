//! Slash commands and free-text answers.

use crate::{
    actions::Command,
    conversation::{Answer, CancelOutcome, Conversation, ConversationState, ReturnTo},
    models::{ActionKind, User},
    store::JoinOutcome,
    Result,
};

use super::{Reply, Router};

pub(super) const WELCOME: &str = "👋 Welcome to Shoppy Bot!\n\n\
I help you manage shared shopping lists with friends and family.\n\n\
Commands:\n\
/newlist - Create a new list\n\
/mylists - View your lists\n\
/help - See all commands";

pub(super) const HELP: &str = "📖 Available Commands:\n\n\
📋 List Management:\n\
/newlist - Create a new list\n\
/mylists - View and manage your lists\n\
/list - View current list items\n\
/add - Add item to current list\n\n\
💡 Tip: Use the buttons in /mylists and /list for easy navigation!\n\n\
/cancel - Cancel current operation\n\
/help - Show this help";

pub(super) const NO_LIST_SELECTED: &str = "❌ No list selected. Use /mylists to select a list.";
const INVALID_INVITE: &str = "❌ Invalid or expired invite link.";

impl Router {
    pub(super) async fn on_command(&self, user: &User, command: Command) -> Result<Reply> {
        // A new command always wins over a pending prompt.
        let pending = user.conversation.clone();
        if pending.is_pending() {
            self.stores.users.clear_conversation(user.id).await?;
        }

        match command {
            Command::Start { invite: Some(token) } => self.join(user, &token).await,
            Command::Start { invite: None } => Ok(Reply::text(WELCOME)),
            Command::Help => Ok(Reply::text(HELP)),
            Command::Cancel => Ok(Reply::text(match pending.cancel() {
                CancelOutcome::NothingToCancel => "Nothing to cancel.",
                CancelOutcome::Cancelled => "✅ Cancelled.",
            })),
            Command::NewList { name: None } => {
                self.stores
                    .users
                    .set_conversation(
                        user.id,
                        &Conversation::waiting(
                            ConversationState::WaitingForListName,
                            ReturnTo::ListsOverview,
                        ),
                    )
                    .await?;
                Ok(Reply::text("📝 What would you like to name your new list?"))
            }
            Command::NewList { name: Some(name) } => self.create_list(user, &name, None).await,
            Command::MyLists => Ok(Reply::screen(self.lists_screen(user, 0).await?)),
            Command::List | Command::Legacy => match self.current_list(user).await? {
                Some(list) => Ok(Reply::screen(self.items_screen(&list, 0).await?)),
                None => Ok(Reply::text(NO_LIST_SELECTED)),
            },
            Command::Add { name } => {
                let Some(list) = self.current_list(user).await? else {
                    return Ok(Reply::text(NO_LIST_SELECTED));
                };
                match name {
                    Some(name) => self.add_item(user, &list, &name, None).await,
                    None => {
                        self.stores
                            .users
                            .set_conversation(
                                user.id,
                                &Conversation::waiting(
                                    ConversationState::WaitingForItemName,
                                    ReturnTo::ManageItems,
                                ),
                            )
                            .await?;
                        Ok(Reply::text(format!(
                            "🛒 What item would you like to add to \"{}\"?",
                            list.name
                        )))
                    }
                }
            }
            Command::Unknown(name) => {
                tracing::debug!(user_id = user.id.0, command = %name, "ignoring unknown command");
                Ok(Reply::none())
            }
        }
    }

    /// Free text: the answer to a pending prompt, or nothing.
    pub(super) async fn on_text(&self, user: &User, text: &str) -> Result<Reply> {
        let answer = user.conversation.answer(text);
        if answer != Answer::Ignored {
            self.stores.users.clear_conversation(user.id).await?;
        }

        match answer {
            Answer::Ignored | Answer::Discarded => Ok(Reply::none()),
            Answer::CreateList { name, return_to } => {
                self.create_list(user, &name, return_to).await
            }
            Answer::AddItem { name, return_to } => match self.current_list(user).await? {
                Some(list) => self.add_item(user, &list, &name, return_to).await,
                None => Ok(Reply::text(NO_LIST_SELECTED)),
            },
            Answer::RenameList { name, return_to } => match self.current_list(user).await? {
                Some(list) => self.rename_list(user, &list, &name, return_to).await,
                None => Ok(Reply::text("❌ No list selected.")),
            },
        }
    }

    async fn join(&self, user: &User, token: &str) -> Result<Reply> {
        let (list, notice) = match self.stores.lists.join(user.id, token).await? {
            JoinOutcome::InvalidToken => return Ok(Reply::text(INVALID_INVITE)),
            JoinOutcome::Joined(list) => {
                let notice = self.record(&list, user, ActionKind::UserJoined, None).await?;
                (list, Some(notice))
            }
            JoinOutcome::AlreadyMember(list) => (list, None),
        };

        self.stores.users.set_current_list(user.id, Some(list.id)).await?;
        Ok(Reply::text(format!("✅ You've joined the list \"{}\"!", list.name))
            .then_screen(self.items_screen(&list, 0).await?)
            .with_notice(notice))
    }
}
