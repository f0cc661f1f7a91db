use crate::domain::{ChatId, ExternalUserId, MessageRef};

/// Transport-agnostic incoming update.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    /// Text starting with `/`.
    Command(TextMessage),
    /// Any other text.
    Text(TextMessage),
    Callback(CallbackQuery),
}

/// Who sent an update, as the platform describes them right now.
#[derive(Clone, Debug)]
pub struct Sender {
    pub id: ExternalUserId,
    pub username: Option<String>,
    pub display_name: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub from: Sender,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub from: Sender,
    pub callback_id: String,
    pub data: String,
    /// The message carrying the pressed button.
    pub message: MessageRef,
}

/// Inline keyboard laid out in rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Lay buttons out `per_row` at a time; the last row may be shorter.
    pub fn grid(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::new();
        let mut row = Vec::with_capacity(per_row);
        for b in buttons {
            row.push(b);
            if row.len() == per_row {
                rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        Self { rows }
    }

    pub fn push_row(&mut self, row: Vec<InlineButton>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_fills_rows_and_keeps_remainder() {
        let buttons = (0..5)
            .map(|i| InlineButton::new(format!("b{i}"), format!("d{i}")))
            .collect();
        let kb = InlineKeyboard::grid(buttons, 2);
        let sizes: Vec<usize> = kb.rows.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(kb.buttons().count(), 5);
    }

    #[test]
    fn push_row_skips_empty_rows() {
        let mut kb = InlineKeyboard::default();
        kb.push_row(vec![]);
        kb.push_row(vec![InlineButton::new("x", "noop")]);
        assert_eq!(kb.rows.len(), 1);
    }
}
