//! Append-only activity log per list.

use std::sync::Arc;

use chrono::Duration;
use sqlx::{Row, SqlitePool};

use crate::{
    domain::{ListId, UserId},
    formatting::clip,
    models::{ActionKind, ActivityEntry, MAX_DETAILS_LEN},
    ports::Clock,
    Error, Result,
};

#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub async fn record(
        &self,
        list_id: ListId,
        actor: UserId,
        action: ActionKind,
        details: Option<&str>,
    ) -> Result<()> {
        let details = details.map(|d| clip(d, MAX_DETAILS_LEN));
        sqlx::query(
            "INSERT INTO activity_logs (list_id, user_id, action, details, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(list_id.0)
        .bind(actor.0)
        .bind(action.as_str())
        .bind(details.as_deref())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest first.
    pub async fn recent(&self, list_id: ListId, limit: u32) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            "SELECT a.id, a.list_id, a.user_id, a.action, a.details, a.created_at, \
                    u.display_name AS actor_name \
             FROM activity_logs a JOIN users u ON u.id = a.user_id \
             WHERE a.list_id = ? ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
        )
        .bind(list_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let action: String = row.try_get("action")?;
                let action = ActionKind::parse(&action)
                    .ok_or_else(|| Error::CorruptRow(format!("unknown action '{action}'")))?;
                Ok(ActivityEntry {
                    id: row.try_get("id")?,
                    list_id: ListId(row.try_get("list_id")?),
                    user_id: UserId(row.try_get("user_id")?),
                    actor_name: row.try_get("actor_name")?,
                    action,
                    details: row.try_get("details")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Delete entries older than `days`; returns how many went.
    pub async fn prune_older_than(&self, days: u32) -> Result<u64> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days));
        let res = sqlx::query("DELETE FROM activity_logs WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::fixture;

    #[tokio::test]
    async fn recent_is_newest_first_with_actor_names() {
        let fx = fixture().await;
        let ann = fx.user(1, "Ann").await;
        let bob = fx.user(2, "Bob").await;
        let list = fx.stores.lists.create(ann.id, "Groceries").await.unwrap();
        let log = &fx.stores.activity;

        log.record(list.id, ann.id, ActionKind::ListCreated, Some("Groceries"))
            .await
            .unwrap();
        fx.clock.advance(Duration::minutes(1));
        log.record(list.id, bob.id, ActionKind::UserJoined, None)
            .await
            .unwrap();
        fx.clock.advance(Duration::minutes(1));
        log.record(list.id, bob.id, ActionKind::ItemAdded, Some("Milk"))
            .await
            .unwrap();

        let entries = log.recent(list.id, 10).await.unwrap();
        let got: Vec<_> = entries
            .iter()
            .map(|e| (e.action, e.actor_name.as_str(), e.details.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                (ActionKind::ItemAdded, "Bob", Some("Milk")),
                (ActionKind::UserJoined, "Bob", None),
                (ActionKind::ListCreated, "Ann", Some("Groceries")),
            ]
        );

        assert_eq!(log.recent(list.id, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn details_are_truncated() {
        let fx = fixture().await;
        let ann = fx.user(1, "Ann").await;
        let list = fx.stores.lists.create(ann.id, "Groceries").await.unwrap();

        let long = "y".repeat(MAX_DETAILS_LEN + 50);
        fx.stores
            .activity
            .record(list.id, ann.id, ActionKind::ItemAdded, Some(&long))
            .await
            .unwrap();

        let entries = fx.stores.activity.recent(list.id, 5).await.unwrap();
        assert_eq!(
            entries[0].details.as_deref().map(|d| d.chars().count()),
            Some(MAX_DETAILS_LEN)
        );
    }

    #[tokio::test]
    async fn prune_drops_only_old_entries() {
        let fx = fixture().await;
        let ann = fx.user(1, "Ann").await;
        let list = fx.stores.lists.create(ann.id, "Groceries").await.unwrap();
        let log = &fx.stores.activity;

        log.record(list.id, ann.id, ActionKind::ItemAdded, Some("old"))
            .await
            .unwrap();
        fx.clock.advance(Duration::days(20));
        log.record(list.id, ann.id, ActionKind::ItemAdded, Some("new"))
            .await
            .unwrap();
        fx.clock.advance(Duration::days(15));

        assert_eq!(log.prune_older_than(30).await.unwrap(), 1);
        let left = log.recent(list.id, 10).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].details.as_deref(), Some("new"));

        assert_eq!(log.prune_older_than(30).await.unwrap(), 0);
    }
}
