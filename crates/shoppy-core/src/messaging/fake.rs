//! Recording messenger for tests.

use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outbound {
    Sent {
        chat_id: ChatId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Edited {
        msg: MessageRef,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Answered {
        callback_id: String,
        text: Option<String>,
    },
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    next_id: Mutex<i32>,
    log: Mutex<Vec<Outbound>>,
    failing: Mutex<HashSet<i64>>,
}

impl FakeMessenger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat_id` fail.
    pub(crate) fn fail_for(&self, chat_id: ChatId) {
        self.failing.lock().unwrap().insert(chat_id.0);
    }

    pub(crate) fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    pub(crate) fn all(&self) -> Vec<Outbound> {
        self.log.lock().unwrap().clone()
    }

    /// Texts of new messages sent to `chat_id`, in order.
    pub(crate) fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Sent { chat_id: c, text, .. } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Toasts, one entry per answered callback.
    pub(crate) fn answers(&self) -> Vec<Option<String>> {
        self.all()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Answered { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    fn check(&self, chat_id: ChatId) -> Result<()> {
        if self.failing.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::External(format!("chat {} unreachable", chat_id.0)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.check(chat_id)?;
        self.log.lock().unwrap().push(Outbound::Sent {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(self.alloc(chat_id))
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.check(msg.chat_id)?;
        self.log.lock().unwrap().push(Outbound::Edited {
            msg,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.log.lock().unwrap().push(Outbound::Answered {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
