//! Best-effort fan-out of list activity to the other members.
//!
//! Batches for the same list are spaced at least `interval` apart. Slots are
//! reserved up front, so concurrent batches queue instead of bursting. The
//! spacing lives in this process only.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};

use crate::{
    domain::{ChatId, ListId, UserId},
    formatting::{format_notification, is_notified},
    messaging::port::MessagingPort,
    models::{ActionKind, ShoppingList, User},
};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return how long to wait for it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

pub struct Notifier {
    messenger: Arc<dyn MessagingPort>,
    interval: Duration,
    per_list: Mutex<HashMap<ListId, IntervalLimiter>>,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn MessagingPort>, interval: Duration) -> Self {
        Self {
            messenger,
            interval,
            per_list: Mutex::new(HashMap::new()),
        }
    }

    /// Tell every member except `actor` about `kind`, if it is an action
    /// members hear about. Returns the number of deliveries.
    pub async fn notify(
        &self,
        list: &ShoppingList,
        members: &[User],
        actor: UserId,
        kind: ActionKind,
        actor_name: &str,
        details: Option<&str>,
    ) -> usize {
        if !is_notified(kind) {
            return 0;
        }
        let recipients: Vec<&User> = members.iter().filter(|u| u.id != actor).collect();
        if recipients.is_empty() {
            return 0;
        }

        let text = format_notification(&list.name, kind, actor_name, details);
        self.fan_out(list.id, &recipients, &text).await
    }

    /// Send `text` to each recipient; one failure never stops the rest.
    pub async fn fan_out(&self, list_id: ListId, recipients: &[&User], text: &str) -> usize {
        self.throttle(list_id).await;

        let mut delivered = 0;
        for user in recipients {
            match self
                .messenger
                .send_text(ChatId::from(user.external_id), text, None)
                .await
            {
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        list_id = list_id.0,
                        user_id = user.id.0,
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        }
        tracing::debug!(list_id = list_id.0, delivered, "notifications sent");
        delivered
    }

    async fn throttle(&self, list_id: ListId) {
        let wait = {
            let mut map = self.per_list.lock().await;
            // A limiter whose next slot has passed holds no state worth keeping.
            let now = Instant::now();
            map.retain(|_, lim| lim.next > now);
            map.entry(list_id)
                .or_insert_with(|| IntervalLimiter::new(self.interval))
                .reserve()
        };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}
