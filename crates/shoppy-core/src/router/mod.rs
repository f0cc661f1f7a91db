//! Event router: one inbound update in, store calls, replies and member
//! notifications out.
//!
//! Handlers never talk to the messenger directly. They return a [`Reply`]
//! which the router delivers: the callback toast first (exactly once per
//! callback), then the screens and texts in order, then the notification
//! fan-out. Any `Err` from a handler is logged and turned into the generic
//! error reply.

use std::{sync::Arc, time::Duration};

use crate::{
    actions::{CallbackAction, Command, JOIN_PREFIX},
    config::Config,
    domain::{ChatId, MessageRef},
    formatting::is_notified,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, IncomingUpdate, InlineKeyboard, Sender, TextMessage},
    },
    models::{ActionKind, ShoppingList, User},
    notify::Notifier,
    screens::Screen,
    store::Stores,
    Result,
};

mod callbacks;
mod commands;
mod prompts;
mod views;

const GENERIC_ERROR: &str = "❌ An error occurred. Please try again.";
const GENERIC_ERROR_TOAST: &str = "An error occurred.";

/// Router knobs that come from configuration and the bot identity.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    pub page_size: usize,
    /// Bot handle without `@`, used in invite links.
    pub bot_username: String,
    pub activity_view_limit: u32,
    pub notification_throttle: Duration,
}

impl RouterSettings {
    pub fn new(cfg: &Config, bot_username: impl Into<String>) -> Self {
        Self {
            page_size: cfg.page_size.max(1),
            bot_username: bot_username.into(),
            activity_view_limit: cfg.activity_view_limit,
            notification_throttle: cfg.notification_throttle,
        }
    }

    pub fn invite_link(&self, share_token: &str) -> String {
        format!(
            "https://t.me/{}?start={JOIN_PREFIX}{share_token}",
            self.bot_username
        )
    }
}

/// One outbound step of a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    Send {
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    /// Replace the message carrying the pressed button. Outside a callback
    /// this degrades to a send.
    Edit {
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
}

/// An activity entry that was recorded and may be fanned out.
#[derive(Clone, Debug)]
pub(crate) struct Notice {
    pub list: ShoppingList,
    pub kind: ActionKind,
    pub details: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Reply {
    pub toast: Option<String>,
    pub effects: Vec<Effect>,
    pub notice: Option<Notice>,
}

impl Reply {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self::none().then_text(text)
    }

    pub(crate) fn screen(screen: Screen) -> Self {
        Self::none().then_screen(screen)
    }

    pub(crate) fn toast(text: impl Into<String>) -> Self {
        Self {
            toast: Some(text.into()),
            ..Self::default()
        }
    }

    pub(crate) fn edit(screen: Screen) -> Self {
        Self::none().then_edit(screen)
    }

    pub(crate) fn edit_text(text: impl Into<String>) -> Self {
        let mut reply = Self::none();
        reply.effects.push(Effect::Edit {
            text: text.into(),
            keyboard: None,
        });
        reply
    }

    pub(crate) fn then_text(mut self, text: impl Into<String>) -> Self {
        self.effects.push(Effect::Send {
            text: text.into(),
            keyboard: None,
        });
        self
    }

    pub(crate) fn then_screen(mut self, screen: Screen) -> Self {
        self.effects.push(Effect::Send {
            text: screen.text,
            keyboard: Some(screen.keyboard),
        });
        self
    }

    pub(crate) fn then_edit(mut self, screen: Screen) -> Self {
        self.effects.push(Effect::Edit {
            text: screen.text,
            keyboard: Some(screen.keyboard),
        });
        self
    }

    pub(crate) fn with_toast(mut self, text: impl Into<String>) -> Self {
        self.toast = Some(text.into());
        self
    }

    pub(crate) fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice;
        self
    }
}

pub struct Router {
    stores: Stores,
    messenger: Arc<dyn MessagingPort>,
    notifier: Notifier,
    settings: RouterSettings,
}

impl Router {
    pub fn new(stores: Stores, messenger: Arc<dyn MessagingPort>, settings: RouterSettings) -> Self {
        let notifier = Notifier::new(messenger.clone(), settings.notification_throttle);
        Self {
            stores,
            messenger,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Handle one update to completion. Failures are logged and reported to
    /// the user; nothing is returned to the transport.
    pub async fn handle(&self, update: IncomingUpdate) {
        match update {
            IncomingUpdate::Command(msg) => {
                let command = Command::parse(&msg.text);
                self.handle_message(msg, command).await;
            }
            IncomingUpdate::Text(msg) => self.handle_message(msg, None).await,
            IncomingUpdate::Callback(q) => self.handle_callback(q).await,
        }
    }

    async fn handle_message(&self, msg: TextMessage, command: Option<Command>) {
        let chat_id = msg.chat_id;
        let result = async {
            let user = self.resolve(&msg.from).await?;
            let reply = match command {
                Some(command) => self.on_command(&user, command).await?,
                None => self.on_text(&user, &msg.text).await?,
            };
            Ok::<_, crate::Error>((user, reply))
        }
        .await;

        match result {
            Ok((user, reply)) => self.deliver(chat_id, None, &user, reply).await,
            Err(e) => {
                tracing::error!(chat_id = chat_id.0, error = %e, "message handling failed");
                if let Err(e) = self.messenger.send_text(chat_id, GENERIC_ERROR, None).await {
                    tracing::warn!(chat_id = chat_id.0, error = %e, "error reply failed");
                }
            }
        }
    }

    async fn handle_callback(&self, q: CallbackQuery) {
        let result = async {
            let user = self.resolve(&q.from).await?;
            let action = CallbackAction::parse(&q.data);
            tracing::debug!(user_id = user.id.0, ?action, "callback");
            let reply = self.on_callback(&user, action).await?;
            Ok::<_, crate::Error>((user, reply))
        }
        .await;

        match result {
            Ok((user, reply)) => {
                self.answer(&q.callback_id, reply.toast.as_deref()).await;
                self.deliver(q.message.chat_id, Some(q.message), &user, reply)
                    .await;
            }
            Err(e) => {
                tracing::error!(data = %q.data, error = %e, "callback handling failed");
                self.answer(&q.callback_id, Some(GENERIC_ERROR_TOAST)).await;
            }
        }
    }

    async fn resolve(&self, sender: &Sender) -> Result<User> {
        self.stores
            .users
            .resolve(sender.id, sender.username.as_deref(), &sender.display_name)
            .await
    }

    async fn answer(&self, callback_id: &str, toast: Option<&str>) {
        if let Err(e) = self.messenger.answer_callback_query(callback_id, toast).await {
            tracing::warn!(error = %e, "callback answer failed");
        }
    }

    async fn deliver(&self, chat_id: ChatId, origin: Option<MessageRef>, actor: &User, reply: Reply) {
        for effect in reply.effects {
            let res = match (effect, origin) {
                (Effect::Edit { text, keyboard }, Some(msg)) => {
                    self.messenger.edit_text(msg, &text, keyboard).await
                }
                (Effect::Edit { text, keyboard }, None) | (Effect::Send { text, keyboard }, _) => {
                    self.messenger
                        .send_text(chat_id, &text, keyboard)
                        .await
                        .map(|_| ())
                }
            };
            if let Err(e) = res {
                tracing::error!(chat_id = chat_id.0, error = %e, "reply delivery failed");
                break;
            }
        }

        if let Some(notice) = reply.notice {
            self.broadcast(actor, notice).await;
        }
    }

    async fn broadcast(&self, actor: &User, notice: Notice) {
        if !is_notified(notice.kind) {
            return;
        }
        let members = match self.stores.lists.member_users(notice.list.id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(list_id = notice.list.id.0, error = %e, "member lookup for notification failed");
                return;
            }
        };
        self.notifier
            .notify(
                &notice.list,
                &members,
                actor.id,
                notice.kind,
                &actor.display_name,
                notice.details.as_deref(),
            )
            .await;
    }

    /// The user's current list, if it still exists and they still belong to
    /// it. A stale pointer is cleared.
    async fn current_list(&self, user: &User) -> Result<Option<ShoppingList>> {
        let Some(list_id) = user.current_list_id else {
            return Ok(None);
        };
        if let Some(list) = self.stores.lists.get(list_id).await? {
            if self.stores.access.has_access(list.id, user.id).await? {
                return Ok(Some(list));
            }
        }
        tracing::debug!(user_id = user.id.0, list_id = list_id.0, "clearing stale current list");
        self.stores.users.set_current_list(user.id, None).await?;
        Ok(None)
    }

    /// Write an activity entry and hand back what to fan out.
    async fn record(
        &self,
        list: &ShoppingList,
        actor: &User,
        kind: ActionKind,
        details: Option<String>,
    ) -> Result<Notice> {
        self.stores
            .activity
            .record(list.id, actor.id, kind, details.as_deref())
            .await?;
        Ok(Notice {
            list: list.clone(),
            kind,
            details,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{ExternalUserId, MessageId},
        messaging::fake::FakeMessenger,
        ports::FixedClock,
        store::{connect_in_memory, Stores},
    };
    use chrono::{TimeZone, Utc};

    pub(crate) struct Harness {
        pub router: Router,
        pub fake: Arc<FakeMessenger>,
        pub stores: Stores,
        pub clock: Arc<FixedClock>,
    }

    pub(crate) fn name_of(external: i64) -> &'static str {
        match external {
            1 => "Ann",
            2 => "Bob",
            3 => "Cy",
            _ => "Someone",
        }
    }

    fn sender(external: i64) -> Sender {
        Sender {
            id: ExternalUserId(external),
            username: None,
            display_name: name_of(external).to_string(),
        }
    }

    pub(crate) async fn harness() -> Harness {
        let pool = connect_in_memory().await.unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        ));
        let stores = Stores::new(pool, clock.clone());
        let fake = Arc::new(FakeMessenger::new());
        let settings = RouterSettings {
            page_size: 6,
            bot_username: "ShoppyBot".to_string(),
            activity_view_limit: 25,
            notification_throttle: Duration::ZERO,
        };
        let router = Router::new(stores.clone(), fake.clone(), settings);
        Harness {
            router,
            fake,
            stores,
            clock,
        }
    }

    impl Harness {
        /// Send `text` from user `external` as the transport would classify it.
        pub(crate) async fn say(&self, external: i64, text: &str) {
            let msg = TextMessage {
                chat_id: ChatId(external),
                from: sender(external),
                text: text.to_string(),
            };
            let update = if text.trim_start().starts_with('/') {
                IncomingUpdate::Command(msg)
            } else {
                IncomingUpdate::Text(msg)
            };
            self.router.handle(update).await;
        }

        pub(crate) async fn press(&self, external: i64, data: &str) {
            self.router
                .handle(IncomingUpdate::Callback(CallbackQuery {
                    from: sender(external),
                    callback_id: format!("cb-{external}"),
                    data: data.to_string(),
                    message: MessageRef {
                        chat_id: ChatId(external),
                        message_id: MessageId(500),
                    },
                }))
                .await;
        }

        pub(crate) async fn user(&self, external: i64) -> User {
            self.stores
                .users
                .get_by_external_id(ExternalUserId(external))
                .await
                .unwrap()
                .unwrap()
        }

        /// Texts of everything user `external` saw, sends and edits alike.
        pub(crate) fn texts(&self, external: i64) -> Vec<String> {
            use crate::messaging::fake::Outbound;
            self.fake
                .take()
                .into_iter()
                .filter_map(|o| match o {
                    Outbound::Sent { chat_id, text, .. } if chat_id == ChatId(external) => {
                        Some(text)
                    }
                    Outbound::Edited { msg, text, .. } if msg.chat_id == ChatId(external) => {
                        Some(text)
                    }
                    _ => None,
                })
                .collect()
        }
    }
}
