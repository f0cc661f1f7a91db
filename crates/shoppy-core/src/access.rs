//! Membership roles and the permission rules built on them.
//!
//! The lookups are read-only. Denials are plain `false`; callers turn them
//! into user-facing messages.

use sqlx::{Row, SqlitePool};

use crate::{
    domain::{ListId, UserId},
    models::Role,
    Result,
};

/// Gated operations on a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    RenameList,
    DeleteList,
    ShareInvite,
    ManageMembers,
    /// Promote, demote or remove another member.
    ChangeMember { target_is_owner: bool },
    Leave { is_owner: bool },
    /// Add, check or hide items.
    EditItems,
}

/// Whether a caller holding `role` on a list may perform `op`.
pub fn permits(role: Option<Role>, op: Operation) -> bool {
    match op {
        Operation::RenameList
        | Operation::DeleteList
        | Operation::ShareInvite
        | Operation::ManageMembers => role == Some(Role::Admin),
        Operation::ChangeMember { target_is_owner } => {
            role == Some(Role::Admin) && !target_is_owner
        }
        Operation::Leave { is_owner } => role.is_some() && !is_owner,
        Operation::EditItems => role.is_some(),
    }
}

#[derive(Clone)]
pub struct AccessControl {
    pool: SqlitePool,
}

impl AccessControl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn role(&self, list_id: ListId, user_id: UserId) -> Result<Option<Role>> {
        let row = sqlx::query("SELECT role FROM memberships WHERE list_id = ? AND user_id = ?")
            .bind(list_id.0)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.try_get("role")?;
        Role::parse(&role)
            .map(Some)
            .ok_or_else(|| crate::Error::CorruptRow(format!("unknown role '{role}'")))
    }

    pub async fn has_access(&self, list_id: ListId, user_id: UserId) -> Result<bool> {
        Ok(self.role(list_id, user_id).await?.is_some())
    }

    pub async fn is_admin(&self, list_id: ListId, user_id: UserId) -> Result<bool> {
        Ok(self.role(list_id, user_id).await? == Some(Role::Admin))
    }

    /// Look up the caller's role and apply [`permits`].
    pub async fn check(&self, list_id: ListId, user_id: UserId, op: Operation) -> Result<bool> {
        Ok(permits(self.role(list_id, user_id).await?, op))
    }
}
