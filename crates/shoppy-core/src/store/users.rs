//! Identity resolution and per-user session columns.

use std::sync::Arc;

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    conversation::{Conversation, ConversationState},
    domain::{ExternalUserId, ListId, UserId},
    formatting::clip,
    models::{User, MAX_USER_NAME_LEN},
    ports::Clock,
    Result,
};

const USER_COLUMNS: &str = "id, external_id, username, display_name, created_at, \
                            current_list_id, conversation_state, pending_action";

#[derive(Clone)]
pub struct UserStore {
    pub(crate) pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl UserStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Find or create the user behind a chat-platform principal.
    ///
    /// A handle or display name that differs from the stored one is written
    /// back before returning.
    pub async fn resolve(
        &self,
        external_id: ExternalUserId,
        username: Option<&str>,
        display_name: &str,
    ) -> Result<User> {
        let username = username
            .map(|u| clip(u.trim().trim_start_matches('@'), MAX_USER_NAME_LEN))
            .filter(|u| !u.is_empty());
        let display_name = clip(display_name.trim(), MAX_USER_NAME_LEN);

        if let Some(mut user) = self.get_by_external_id(external_id).await? {
            if user.username != username || user.display_name != display_name {
                sqlx::query("UPDATE users SET username = ?, display_name = ? WHERE id = ?")
                    .bind(username.as_deref())
                    .bind(&display_name)
                    .bind(user.id.0)
                    .execute(&self.pool)
                    .await?;
                tracing::debug!(user_id = user.id.0, "user metadata refreshed");
                user.username = username;
                user.display_name = display_name;
            }
            return Ok(user);
        }

        // Two first contacts may race; the loser falls through to the re-read.
        sqlx::query(
            "INSERT INTO users (external_id, username, display_name, created_at) \
             VALUES (?, ?, ?, ?) ON CONFLICT(external_id) DO NOTHING",
        )
        .bind(external_id.0)
        .bind(username.as_deref())
        .bind(&display_name)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;

        let user = self.get_by_external_id(external_id).await?.ok_or_else(|| {
            crate::Error::CorruptRow(format!("user {} vanished after insert", external_id.0))
        })?;
        tracing::info!(user_id = user.id.0, "new user");
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_by_external_id(&self, external_id: ExternalUserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = ?"
        ))
        .bind(external_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Case-insensitive lookup; a leading `@` is ignored.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let needle = username.trim().trim_start_matches('@');
        if needle.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE LIMIT 1"
        ))
        .bind(needle)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn set_current_list(&self, id: UserId, list_id: Option<ListId>) -> Result<()> {
        sqlx::query("UPDATE users SET current_list_id = ? WHERE id = ?")
            .bind(list_id.map(|l| l.0))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_conversation(&self, id: UserId, conversation: &Conversation) -> Result<()> {
        sqlx::query("UPDATE users SET conversation_state = ?, pending_action = ? WHERE id = ?")
            .bind(conversation.state.as_str())
            .bind(conversation.pending_action.as_deref())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_conversation(&self, id: UserId) -> Result<()> {
        self.set_conversation(id, &Conversation::idle()).await
    }
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User> {
    let state: String = row.try_get("conversation_state")?;
    let state = ConversationState::parse(&state).unwrap_or_else(|| {
        tracing::warn!(state = %state, "unknown conversation state, treating as idle");
        ConversationState::None
    });

    Ok(User {
        id: UserId(row.try_get("id")?),
        external_id: ExternalUserId(row.try_get("external_id")?),
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        created_at: row.try_get("created_at")?,
        current_list_id: row.try_get::<Option<i64>, _>("current_list_id")?.map(ListId),
        conversation: Conversation {
            state,
            pending_action: row.try_get("pending_action")?,
        },
    })
}
