//! Telegram update handlers.
//!
//! Each handler converts a teloxide update into the core's `IncomingUpdate`
//! and hands it to the router. Updates the bot has no use for are dropped
//! here.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use shoppy_core::{
    domain::{ChatId, ExternalUserId, MessageId, MessageRef},
    messaging::types::{self as core_types, IncomingUpdate, Sender, TextMessage},
};

use crate::router::AppState;

/// "First Last", trimmed; the last name is optional.
pub fn display_name(first: &str, last: Option<&str>) -> String {
    format!("{} {}", first, last.unwrap_or("")).trim().to_string()
}

pub fn sender(user: &User) -> Sender {
    Sender {
        id: ExternalUserId(user.id.0 as i64),
        username: user.username.clone(),
        display_name: display_name(&user.first_name, user.last_name.as_deref()),
    }
}

/// Commands start with `/`; everything else is free text.
pub fn classify(chat_id: ChatId, from: Sender, text: &str) -> IncomingUpdate {
    let msg = TextMessage {
        chat_id,
        from,
        text: text.to_string(),
    };
    if text.trim_start().starts_with('/') {
        IncomingUpdate::Command(msg)
    } else {
        IncomingUpdate::Text(msg)
    }
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let (Some(text), Some(from)) = (msg.text(), msg.from()) else {
        return Ok(());
    };

    let update = classify(ChatId(msg.chat.id.0), sender(from), text);
    state.router.handle(update).await;
    Ok(())
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    // Buttons on inline-mode messages have no chat to answer into.
    let Some(message) = q.message.as_ref() else {
        answer_plain(&bot, q.id.clone()).await;
        return Ok(());
    };

    let update = IncomingUpdate::Callback(core_types::CallbackQuery {
        from: sender(&q.from),
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message: MessageRef {
            chat_id: ChatId(message.chat.id.0),
            message_id: MessageId(message.id.0),
        },
    });
    state.router.handle(update).await;
    Ok(())
}

/// Stop the client's spinner without a toast. Returns whether Telegram took it.
async fn answer_plain(bot: &Bot, callback_id: String) -> bool {
    match bot.answer_callback_query(callback_id).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "callback answer failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> Sender {
        Sender {
            id: ExternalUserId(42),
            username: Some("ann".to_string()),
            display_name: "Ann".to_string(),
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("Ann", Some("Lee")), "Ann Lee");
        assert_eq!(display_name("Ann", None), "Ann");
        assert_eq!(display_name("Ann", Some("")), "Ann");
    }

    #[tokio::test]
    async fn failed_plain_answer_is_reported_not_raised() {
        let bot = Bot::new("123:test").set_api_url("http://127.0.0.1:9/".parse().unwrap());
        assert!(!answer_plain(&bot, "cb-1".to_string()).await);
    }

    #[test]
    fn classification() {
        assert!(matches!(
            classify(ChatId(42), ann(), "/newlist Trip"),
            IncomingUpdate::Command(m) if m.text == "/newlist Trip" && m.chat_id == ChatId(42)
        ));
        assert!(matches!(
            classify(ChatId(42), ann(), "Milk"),
            IncomingUpdate::Text(m) if m.from.username.as_deref() == Some("ann")
        ));
    }
}
