//! Shopping lists, their share tokens and memberships.

use std::sync::Arc;

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    access::{permits, AccessControl, Operation},
    domain::{ListId, UserId},
    models::{ListWithRole, MemberWithRole, Role, ShoppingList, User},
    ports::Clock,
    store::users::user_from_row,
    token, Error, Result,
};

const TOKEN_ATTEMPTS: usize = 3;

/// Result of following an invite link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(ShoppingList),
    /// The user already had a membership; it was left untouched.
    AlreadyMember(ShoppingList),
    InvalidToken,
}

impl JoinOutcome {
    pub fn list(&self) -> Option<&ShoppingList> {
        match self {
            JoinOutcome::Joined(l) | JoinOutcome::AlreadyMember(l) => Some(l),
            JoinOutcome::InvalidToken => None,
        }
    }
}

#[derive(Clone)]
pub struct ListStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    access: AccessControl,
}

impl ListStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, access: AccessControl) -> Self {
        Self {
            pool,
            clock,
            access,
        }
    }

    /// Create a list with a fresh share token; the creator becomes its admin.
    pub async fn create(&self, creator: UserId, name: &str) -> Result<ShoppingList> {
        let now = self.clock.now();

        for attempt in 1..=TOKEN_ATTEMPTS {
            let share_token = token::generate();
            let mut tx = self.pool.begin().await?;

            let inserted = sqlx::query(
                "INSERT INTO lists (name, creator_id, share_token, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(name)
            .bind(creator.0)
            .bind(&share_token)
            .bind(now)
            .execute(&mut *tx)
            .await;

            let list_id = match inserted {
                Ok(res) => ListId(res.last_insert_rowid()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tracing::warn!(attempt, "share token collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            sqlx::query(
                "INSERT INTO memberships (user_id, list_id, role, joined_at) VALUES (?, ?, ?, ?)",
            )
            .bind(creator.0)
            .bind(list_id.0)
            .bind(Role::Admin.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            tracing::info!(list_id = list_id.0, user_id = creator.0, "list created");

            return Ok(ShoppingList {
                id: list_id,
                name: name.to_string(),
                creator_id: creator,
                share_token,
                created_at: now,
            });
        }

        Err(Error::External(
            "could not allocate a unique share token".to_string(),
        ))
    }

    pub async fn get(&self, id: ListId) -> Result<Option<ShoppingList>> {
        let row = sqlx::query(
            "SELECT id, name, creator_id, share_token, created_at FROM lists WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(list_from_row).transpose()
    }

    pub async fn get_by_share_token(&self, share_token: &str) -> Result<Option<ShoppingList>> {
        if !token::is_valid(share_token) {
            return Ok(None);
        }
        let row = sqlx::query(
            "SELECT id, name, creator_id, share_token, created_at FROM lists WHERE share_token = ?",
        )
        .bind(share_token)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(list_from_row).transpose()
    }

    /// Every list the user belongs to, in joining order.
    pub async fn lists_for_user(&self, user_id: UserId) -> Result<Vec<ListWithRole>> {
        let rows = sqlx::query(
            "SELECT l.id, l.name, l.creator_id, l.share_token, l.created_at, m.role \
             FROM memberships m JOIN lists l ON l.id = m.list_id \
             WHERE m.user_id = ? ORDER BY m.id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ListWithRole {
                    list: list_from_row(row)?,
                    role: role_from_row(row)?,
                })
            })
            .collect()
    }

    /// Every member of the list, in joining order.
    pub async fn members(&self, list_id: ListId) -> Result<Vec<MemberWithRole>> {
        let rows = sqlx::query(
            "SELECT u.id AS id, u.external_id AS external_id, u.username AS username, \
                    u.display_name AS display_name, u.created_at AS created_at, \
                    u.current_list_id AS current_list_id, \
                    u.conversation_state AS conversation_state, \
                    u.pending_action AS pending_action, m.role AS role \
             FROM memberships m JOIN users u ON u.id = m.user_id \
             WHERE m.list_id = ? ORDER BY m.id",
        )
        .bind(list_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MemberWithRole {
                    user: user_from_row(row)?,
                    role: role_from_row(row)?,
                })
            })
            .collect()
    }

    pub async fn member_users(&self, list_id: ListId) -> Result<Vec<User>> {
        Ok(self
            .members(list_id)
            .await?
            .into_iter()
            .map(|m| m.user)
            .collect())
    }

    pub async fn rename(&self, list_id: ListId, actor: UserId, name: &str) -> Result<bool> {
        if !self.access.check(list_id, actor, Operation::RenameList).await? {
            return Ok(false);
        }
        let res = sqlx::query("UPDATE lists SET name = ? WHERE id = ?")
            .bind(name)
            .bind(list_id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Delete the list; items, memberships and logs go with it.
    pub async fn delete(&self, list_id: ListId, actor: UserId) -> Result<bool> {
        if !self.access.check(list_id, actor, Operation::DeleteList).await? {
            return Ok(false);
        }
        let res = sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(list_id.0)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() > 0 {
            tracing::info!(list_id = list_id.0, user_id = actor.0, "list deleted");
        }
        Ok(res.rows_affected() > 0)
    }

    /// Replace the share token, invalidating old invite links.
    pub async fn regenerate_share_token(
        &self,
        list_id: ListId,
        actor: UserId,
    ) -> Result<Option<String>> {
        if !self.access.check(list_id, actor, Operation::ShareInvite).await? {
            return Ok(None);
        }

        for _ in 0..TOKEN_ATTEMPTS {
            let share_token = token::generate();
            let res = sqlx::query("UPDATE lists SET share_token = ? WHERE id = ?")
                .bind(&share_token)
                .bind(list_id.0)
                .execute(&self.pool)
                .await;
            match res {
                Ok(r) if r.rows_affected() > 0 => return Ok(Some(share_token)),
                Ok(_) => return Ok(None),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::External(
            "could not allocate a unique share token".to_string(),
        ))
    }

    /// Join by invite token. An existing membership is never modified.
    pub async fn join(&self, user_id: UserId, share_token: &str) -> Result<JoinOutcome> {
        let Some(list) = self.get_by_share_token(share_token).await? else {
            return Ok(JoinOutcome::InvalidToken);
        };

        let res = sqlx::query(
            "INSERT INTO memberships (user_id, list_id, role, joined_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, list_id) DO NOTHING",
        )
        .bind(user_id.0)
        .bind(list.id.0)
        .bind(Role::Member.as_str())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Ok(JoinOutcome::AlreadyMember(list));
        }
        tracing::info!(list_id = list.id.0, user_id = user_id.0, "user joined list");
        Ok(JoinOutcome::Joined(list))
    }

    /// Drop the caller's membership. The creator can never leave.
    pub async fn leave(&self, list_id: ListId, user_id: UserId) -> Result<bool> {
        let Some(list) = self.get(list_id).await? else {
            return Ok(false);
        };
        let role = self.access.role(list_id, user_id).await?;
        let is_owner = list.is_owner(user_id);
        if !permits(role, Operation::Leave { is_owner }) {
            return Ok(false);
        }
        self.delete_membership(list_id, user_id).await
    }

    /// Make a member an admin. Fails if the target already is one.
    pub async fn promote(&self, list_id: ListId, actor: UserId, target: UserId) -> Result<bool> {
        if !self.may_change(list_id, actor, target).await? {
            return Ok(false);
        }
        self.set_role(list_id, target, Role::Member, Role::Admin).await
    }

    /// Make an admin a plain member. Fails if the target is not an admin.
    pub async fn demote(&self, list_id: ListId, actor: UserId, target: UserId) -> Result<bool> {
        if !self.may_change(list_id, actor, target).await? {
            return Ok(false);
        }
        self.set_role(list_id, target, Role::Admin, Role::Member).await
    }

    pub async fn remove(&self, list_id: ListId, actor: UserId, target: UserId) -> Result<bool> {
        if !self.may_change(list_id, actor, target).await? {
            return Ok(false);
        }
        self.delete_membership(list_id, target).await
    }

    async fn may_change(&self, list_id: ListId, actor: UserId, target: UserId) -> Result<bool> {
        let Some(list) = self.get(list_id).await? else {
            return Ok(false);
        };
        let role = self.access.role(list_id, actor).await?;
        Ok(permits(
            role,
            Operation::ChangeMember {
                target_is_owner: list.is_owner(target),
            },
        ))
    }

    async fn set_role(&self, list_id: ListId, user_id: UserId, from: Role, to: Role) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE memberships SET role = ? WHERE list_id = ? AND user_id = ? AND role = ?",
        )
        .bind(to.as_str())
        .bind(list_id.0)
        .bind(user_id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_membership(&self, list_id: ListId, user_id: UserId) -> Result<bool> {
        let res = sqlx::query("DELETE FROM memberships WHERE list_id = ? AND user_id = ?")
            .bind(list_id.0)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

fn list_from_row(row: &SqliteRow) -> Result<ShoppingList> {
    Ok(ShoppingList {
        id: ListId(row.try_get("id")?),
        name: row.try_get("name")?,
        creator_id: UserId(row.try_get("creator_id")?),
        share_token: row.try_get("share_token")?,
        created_at: row.try_get("created_at")?,
    })
}

fn role_from_row(row: &SqliteRow) -> Result<Role> {
    let role: String = row.try_get("role")?;
    Role::parse(&role).ok_or_else(|| Error::CorruptRow(format!("unknown role '{role}'")))
}
