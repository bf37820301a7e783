//! Change-capture listener for the discovery store's `notification` table.
//!
//! A startup-installed trigger publishes every inserted row as JSON on a
//! LISTEN/NOTIFY channel. The listener decodes payloads into
//! [`NotificationEvent`]s and appends them to a pending batch that the batch
//! processor drains on its poll interval.

use std::sync::{Arc, Mutex};

use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::db::models::NotificationEvent;
use crate::error::{AppError, AppResult};

/// Shared accumulator between the listener (producer) and the batch
/// processor (consumer). `take_pending` swaps in a fresh empty batch, so no
/// event is ever handed out twice and none is lost between takes.
#[derive(Clone, Default)]
pub struct PendingBatch {
    inner: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: NotificationEvent) {
        let mut pending = self.inner.lock().expect("pending batch lock poisoned");
        pending.push(event);
    }

    /// Atomically returns the accumulated events and resets the batch.
    /// `None` when nothing accumulated, so idle ticks allocate no work.
    pub fn take_pending(&self) -> Option<Vec<NotificationEvent>> {
        let mut pending = self.inner.lock().expect("pending batch lock poisoned");
        if pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *pending))
        }
    }
}

fn decode_payload(payload: &str) -> Option<NotificationEvent> {
    match serde_json::from_str::<NotificationEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Dropping malformed notification payload: {}", e);
            None
        }
    }
}

pub struct NotificationListener {
    pool: PgPool,
    channel: String,
    pending: PendingBatch,
}

impl NotificationListener {
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
            pending: PendingBatch::new(),
        }
    }

    /// Handle for the batch processor to drain from.
    pub fn pending(&self) -> PendingBatch {
        self.pending.clone()
    }

    /// Install the insert trigger that publishes new notification rows on
    /// this listener's channel. Idempotent: drops and recreates the trigger.
    pub async fn install_trigger(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION notify_notification_insert() RETURNS trigger AS $f$
            BEGIN
                PERFORM pg_notify(TG_ARGV[0], row_to_json(NEW)::text);
                RETURN NEW;
            END;
            $f$ LANGUAGE plpgsql;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            DROP TRIGGER IF EXISTS notification_insert_trigger ON notification;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let create_trigger = format!(
            r#"
            CREATE TRIGGER notification_insert_trigger
            AFTER INSERT ON notification
            FOR EACH ROW
            EXECUTE FUNCTION notify_notification_insert('{}');
            "#,
            self.channel.replace('\'', "''")
        );

        sqlx::query(&create_trigger)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(
            "Installed notification insert trigger on channel '{}'",
            self.channel
        );
        Ok(())
    }

    /// Subscribe and accumulate until shutdown. Malformed payloads are
    /// dropped; losing the connection is fatal and surfaces as an error so
    /// the process exits and the supervisor restarts it.
    pub async fn run(
        &self,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> AppResult<()> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(AppError::Database)?;
        listener
            .listen(&self.channel)
            .await
            .map_err(AppError::Database)?;

        tracing::info!("Listening for notification inserts on '{}'", self.channel);

        loop {
            tokio::select! {
                result = listener.recv() => {
                    match result {
                        Ok(notification) => {
                            if let Some(event) = decode_payload(notification.payload()) {
                                tracing::debug!(
                                    "Queued notification {} (type={})",
                                    event.id,
                                    event.kind
                                );
                                self.pending.append(event);
                            }
                        }
                        Err(e) => {
                            tracing::error!("Notification listener connection lost: {}", e);
                            return Err(AppError::Database(e));
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Notification listener shutting down");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(id: &str) -> NotificationEvent {
        NotificationEvent {
            id: id.to_string(),
            kind: "follow".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: "1".to_string(),
            group_id: "follow:2".to_string(),
            data: serde_json::json!({}),
            user_ids: vec![2],
        }
    }

    #[test]
    fn take_pending_returns_batch_once() {
        let batch = PendingBatch::new();
        batch.append(event("a"));
        batch.append(event("b"));

        let taken = batch.take_pending().expect("first take should be non-empty");
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].id, "a");
        assert_eq!(taken[1].id, "b");

        assert!(batch.take_pending().is_none());
    }

    #[test]
    fn take_pending_empty_is_none() {
        let batch = PendingBatch::new();
        assert!(batch.take_pending().is_none());
    }

    #[test]
    fn events_appended_after_take_are_kept() {
        let batch = PendingBatch::new();
        batch.append(event("a"));
        let _ = batch.take_pending();

        batch.append(event("b"));
        let taken = batch.take_pending().unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].id, "b");
    }

    #[test]
    fn decode_drops_malformed_payload() {
        assert!(decode_payload("not json").is_none());
        assert!(decode_payload("{\"id\": 1}").is_none());
    }

    #[test]
    fn decode_accepts_trigger_payload() {
        let payload = r#"{
            "id": "n1",
            "type": "follow",
            "timestamp": "2024-01-01T00:00:00",
            "specifier": "1",
            "group_id": "follow:2",
            "data": {"follower_user_id": 1, "followee_user_id": 2},
            "user_ids": [2]
        }"#;
        let event = decode_payload(payload).expect("payload should decode");
        assert_eq!(event.kind, "follow");
        assert_eq!(event.user_ids, vec![2]);
    }
}
