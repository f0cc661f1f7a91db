//! Background upkeep that runs alongside the dispatcher.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use shoppy_core::store::ActivityLog;

/// Periodically drop activity entries older than `retention_days`.
///
/// The first pass runs immediately. The task ends when `cancel` fires.
pub fn spawn_activity_pruner(
    log: ActivityLog,
    retention_days: u32,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    match log.prune_older_than(retention_days).await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(removed = n, retention_days, "pruned activity log"),
                        Err(e) => tracing::warn!(error = %e, "activity log pruning failed"),
                    }
                }
            }
        }
        tracing::debug!("activity pruner stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use shoppy_core::{
        domain::ExternalUserId,
        models::ActionKind,
        ports::FixedClock,
        store::{connect_in_memory, Stores},
    };

    #[tokio::test]
    async fn prunes_old_entries_and_stops_on_cancel() {
        let pool = connect_in_memory().await.unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
        ));
        let stores = Stores::new(pool, clock.clone());
        let ann = stores
            .users
            .resolve(ExternalUserId(1), None, "Ann")
            .await
            .unwrap();
        let list = stores.lists.create(ann.id, "Groceries").await.unwrap();
        stores
            .activity
            .record(list.id, ann.id, ActionKind::ItemAdded, Some("Milk"))
            .await
            .unwrap();
        clock.advance(ChronoDuration::days(45));

        let cancel = CancellationToken::new();
        let handle = spawn_activity_pruner(
            stores.activity.clone(),
            30,
            Duration::from_secs(3600),
            cancel.clone(),
        );

        let mut remaining = 1;
        for _ in 0..100 {
            remaining = stores.activity.recent(list.id, 10).await.unwrap().len();
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(remaining, 0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
