//! Direct-message notification poll task.
//!
//! Separate from the row-event listener: finds unread messages and reactions
//! older than the notification delay and not yet notified, using two
//! independent persisted watermarks. The delay gives the receiver a window
//! to read the message before a push fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::error::AppResult;
use crate::notifications::{DispatchContext, Message, MessageReaction, TypedNotification};
use crate::store::CursorStore;

pub const MESSAGE_CURSOR_KEY: &str = "dm_message_timestamp";
pub const REACTION_CURSOR_KEY: &str = "dm_reaction_timestamp";

const CURSOR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub struct DmNotificationTask {
    ctx: DispatchContext,
    cursors: Arc<dyn CursorStore>,
    poll_interval: Duration,
    delay: chrono::Duration,
}

impl DmNotificationTask {
    pub fn new(
        ctx: DispatchContext,
        cursors: Arc<dyn CursorStore>,
        poll_interval: Duration,
        delay: Duration,
    ) -> Self {
        Self {
            ctx,
            cursors,
            poll_interval,
            delay: chrono::Duration::milliseconds(delay.as_millis() as i64),
        }
    }

    pub async fn run(&self, mut shutdown_rx: tokio::sync::broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("DM notification task shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let now = chrono::Utc::now().naive_utc();
            if let Err(e) = self.tick(now).await {
                tracing::warn!("DM notification pass failed: {:?}", e);
            }
        }
    }

    /// One pass over both cursors. Each advances independently so a failure
    /// in one stream does not stall the other.
    pub async fn tick(&self, now: NaiveDateTime) -> AppResult<()> {
        let max_cursor = now - self.delay;

        if let Err(e) = self.process_messages(max_cursor).await {
            tracing::warn!("DM message pass failed: {:?}", e);
        }
        if let Err(e) = self.process_reactions(max_cursor).await {
            tracing::warn!("DM reaction pass failed: {:?}", e);
        }

        Ok(())
    }

    /// Absent cursor defaults to the window max: events older than one delay
    /// window at first boot are skipped by design.
    async fn load_cursor(&self, key: &str, default: NaiveDateTime) -> AppResult<NaiveDateTime> {
        let stored = self.cursors.get(key).await?;
        Ok(stored
            .and_then(|value| NaiveDateTime::parse_from_str(&value, CURSOR_FORMAT).ok())
            .unwrap_or(default))
    }

    async fn store_cursor(&self, key: &str, value: NaiveDateTime) -> AppResult<()> {
        self.cursors
            .set(key, &value.format(CURSOR_FORMAT).to_string())
            .await
    }

    async fn process_messages(&self, max_cursor: NaiveDateTime) -> AppResult<()> {
        let min_cursor = self.load_cursor(MESSAGE_CURSOR_KEY, max_cursor).await?;
        if min_cursor >= max_cursor {
            return self.store_cursor(MESSAGE_CURSOR_KEY, max_cursor).await;
        }

        let mut events = self.ctx.discovery.unread_messages(min_cursor, max_cursor).await?;
        // Causal order for the receiver even if the query returns unordered.
        events.sort_by_key(|e| e.created_at);

        let new_cursor = events
            .iter()
            .map(|e| e.created_at)
            .max()
            .unwrap_or(max_cursor);

        for event in &events {
            let notification = TypedNotification::Message(Message::from_dm(event));
            if let Err(e) = notification.dispatch(&self.ctx).await {
                tracing::warn!(
                    "Failed to dispatch message notification for chat {}: {:?}",
                    event.chat_id,
                    e
                );
            }
        }

        self.store_cursor(MESSAGE_CURSOR_KEY, new_cursor).await
    }

    async fn process_reactions(&self, max_cursor: NaiveDateTime) -> AppResult<()> {
        let min_cursor = self.load_cursor(REACTION_CURSOR_KEY, max_cursor).await?;
        if min_cursor >= max_cursor {
            return self.store_cursor(REACTION_CURSOR_KEY, max_cursor).await;
        }

        let mut events = self
            .ctx
            .discovery
            .unread_reactions(min_cursor, max_cursor)
            .await?;
        events.sort_by_key(|e| e.created_at);

        let new_cursor = events
            .iter()
            .map(|e| e.created_at)
            .max()
            .unwrap_or(max_cursor);

        for event in &events {
            let notification = TypedNotification::MessageReaction(MessageReaction::from_dm(event));
            if let Err(e) = notification.dispatch(&self.ctx).await {
                tracing::warn!(
                    "Failed to dispatch reaction notification for chat {}: {:?}",
                    event.chat_id,
                    e
                );
            }
        }

        self.store_cursor(REACTION_CURSOR_KEY, new_cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DmEvent, PushDevice};
    use crate::testing::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap()
    }

    fn dm(message_id: &str, sender: i32, receiver: i32, created_at: NaiveDateTime) -> DmEvent {
        DmEvent {
            chat_id: "chat1".to_string(),
            message_id: message_id.to_string(),
            sender_user_id: sender,
            receiver_user_id: receiver,
            created_at,
        }
    }

    fn task(harness: &TestHarness, cursors: Arc<FakeCursorStore>) -> DmNotificationTask {
        DmNotificationTask::new(
            harness.ctx(),
            cursors,
            Duration::from_secs(60),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn pushes_dispatch_in_timestamp_order() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "sender"))
            .with_user(test_user(2, "receiver"))
            // Unordered on purpose: T2 before T1.
            .with_messages(vec![dm("m2", 1, 2, at(10)), dm("m1", 1, 2, at(5))]);
        let identity = FakeIdentityStore::new().with_devices(
            2,
            vec![PushDevice {
                device_type: "ios".to_string(),
                target_arn: "arn:2".to_string(),
                enabled: true,
            }],
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let cursors = Arc::new(FakeCursorStore::new());
        cursors
            .set(MESSAGE_CURSOR_KEY, &at(0).format(CURSOR_FORMAT).to_string())
            .await
            .unwrap();

        task(&harness, cursors.clone()).tick(at(20)).await.unwrap();

        let calls = harness.push.calls();
        assert_eq!(calls.len(), 2);
        // Both are "sender sent you a message"; order is asserted through
        // the badge counts carried on each push (1 then 2).
        assert_eq!(calls[0].0.badge_count, 1);
        assert_eq!(calls[1].0.badge_count, 2);

        // Cursor advanced to the max observed timestamp.
        let stored = cursors.get(MESSAGE_CURSOR_KEY).await.unwrap().unwrap();
        assert_eq!(
            NaiveDateTime::parse_from_str(&stored, CURSOR_FORMAT).unwrap(),
            at(10)
        );
    }

    #[tokio::test]
    async fn absent_cursor_skips_old_events() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "sender"))
            .with_user(test_user(2, "receiver"))
            .with_messages(vec![dm("m1", 1, 2, at(1))]);
        let identity = FakeIdentityStore::new().with_devices(
            2,
            vec![PushDevice {
                device_type: "ios".to_string(),
                target_arn: "arn:2".to_string(),
                enabled: true,
            }],
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let cursors = Arc::new(FakeCursorStore::new());
        // No cursor stored: window collapses to (now - delay, now - delay].
        task(&harness, cursors.clone()).tick(at(20)).await.unwrap();

        assert!(harness.push.calls().is_empty());
        assert!(cursors.get(MESSAGE_CURSOR_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reaction_cursor_advances_independently() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "sender"))
            .with_user(test_user(2, "receiver"))
            .with_reactions(vec![dm("m1", 1, 2, at(8))]);
        let identity = FakeIdentityStore::new().with_devices(
            2,
            vec![PushDevice {
                device_type: "ios".to_string(),
                target_arn: "arn:2".to_string(),
                enabled: true,
            }],
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let cursors = Arc::new(FakeCursorStore::new());
        cursors
            .set(REACTION_CURSOR_KEY, &at(0).format(CURSOR_FORMAT).to_string())
            .await
            .unwrap();

        task(&harness, cursors.clone()).tick(at(20)).await.unwrap();

        // The message pass had no cursor and stays quiet; only the reaction
        // push goes out.
        let calls = harness.push.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.title, "Reaction");

        let stored = cursors.get(REACTION_CURSOR_KEY).await.unwrap().unwrap();
        assert_eq!(
            NaiveDateTime::parse_from_str(&stored, CURSOR_FORMAT).unwrap(),
            at(8)
        );
    }

    #[tokio::test]
    async fn cursor_advances_to_window_max_when_empty() {
        let discovery = FakeDiscoveryStore::new();
        let identity = FakeIdentityStore::new();
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let cursors = Arc::new(FakeCursorStore::new());
        cursors
            .set(MESSAGE_CURSOR_KEY, &at(0).format(CURSOR_FORMAT).to_string())
            .await
            .unwrap();

        task(&harness, cursors.clone()).tick(at(20)).await.unwrap();

        let stored = cursors.get(MESSAGE_CURSOR_KEY).await.unwrap().unwrap();
        assert_eq!(
            NaiveDateTime::parse_from_str(&stored, CURSOR_FORMAT).unwrap(),
            at(15)
        );
    }
}
