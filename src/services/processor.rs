//! Push dispatch loop: drains the pending batch on a fixed interval, maps
//! raw events to typed notifications, and dispatches them one at a time.

use std::time::Duration;

use crate::listener::PendingBatch;
use crate::notifications::{map_event, DispatchContext};

pub struct BatchProcessor {
    pending: PendingBatch,
    ctx: DispatchContext,
    poll_interval: Duration,
}

impl BatchProcessor {
    pub fn new(pending: PendingBatch, ctx: DispatchContext, poll_interval: Duration) -> Self {
        Self {
            pending,
            ctx,
            poll_interval,
        }
    }

    pub async fn run(&self, mut shutdown_rx: tokio::sync::broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Batch processor shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            self.tick().await;
        }
    }

    /// One drain pass. Unmapped events are filtered out; a failing dispatch
    /// is logged and the event is consumed (at-most-once push attempt).
    /// Dispatch is sequential so badge increments stay consistent.
    pub async fn tick(&self) {
        let events = match self.pending.take_pending() {
            Some(events) => events,
            None => return,
        };

        tracing::debug!("Processing batch of {} notification events", events.len());

        let notifications: Vec<_> = events.iter().filter_map(map_event).collect();
        for notification in notifications {
            if let Err(e) = notification.dispatch(&self.ctx).await {
                tracing::warn!(
                    "Failed to dispatch {} notification: {:?}",
                    notification.kind_str(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{EmailFrequency, NotificationEvent, Playlist, PushDevice};
    use crate::testing::*;
    use chrono::NaiveDate;

    fn follow_event(id: &str, follower: i32, receiver: i32) -> NotificationEvent {
        NotificationEvent {
            id: id.to_string(),
            kind: "follow".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: follower.to_string(),
            group_id: format!("follow:{}", receiver),
            data: serde_json::json!({
                "follower_user_id": follower,
                "followee_user_id": receiver
            }),
            user_ids: vec![receiver],
        }
    }

    fn ios_device(arn: &str) -> PushDevice {
        PushDevice {
            device_type: "ios".to_string(),
            target_arn: arn.to_string(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn follow_push_end_to_end() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new().with_devices(2, vec![ios_device("arn:2")]);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(follow_event("n1", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        let calls = harness.push.calls();
        assert_eq!(calls.len(), 1);
        let (target, message) = &calls[0];
        assert_eq!(target.device_type, "ios");
        assert_eq!(target.target_arn, "arn:2");
        assert_eq!(target.badge_count, 1);
        assert_eq!(message.title, "Follow");
        assert_eq!(message.body, "user_1 followed you");
        assert_eq!(harness.identity.badge_count(2), 1);
    }

    #[tokio::test]
    async fn badge_increments_once_per_event() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(3, "user_3"))
            .with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new().with_devices(2, vec![ios_device("arn:2")]);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(follow_event("n1", 1, 2));
        pending.append(follow_event("n2", 3, 2));
        pending.append(follow_event("n3", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert_eq!(harness.push.calls().len(), 3);
        assert_eq!(harness.identity.badge_count(2), 3);
    }

    #[tokio::test]
    async fn deactivated_receiver_gets_nothing() {
        let mut receiver = test_user(2, "user_2");
        receiver.is_deactivated = true;
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(receiver);
        let identity = FakeIdentityStore::new().with_devices(2, vec![ios_device("arn:2")]);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(follow_event("n1", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert!(harness.push.calls().is_empty());
        assert!(harness.email.calls().is_empty());
        assert_eq!(harness.identity.badge_count(2), 0);
    }

    #[tokio::test]
    async fn disabled_category_toggle_suppresses_push() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(3, "user_3"))
            .with_user(test_user(2, "user_2"))
            .with_track(test_track(10, "Track Ten", 2));
        let identity = FakeIdentityStore::new()
            .with_devices(2, vec![ios_device("arn:2")])
            .with_toggle(2, |toggles| toggles.favorites = false);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(NotificationEvent {
            id: "s1".to_string(),
            kind: "save".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: "3".to_string(),
            group_id: "save:track:10".to_string(),
            data: serde_json::json!({
                "type": "track",
                "user_id": 3,
                "save_item_id": 10
            }),
            user_ids: vec![2],
        });
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert!(harness.push.calls().is_empty());
        assert_eq!(harness.identity.badge_count(2), 0);
    }

    #[tokio::test]
    async fn abuse_flagged_pair_suppresses_delivery() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new()
            .with_devices(2, vec![ios_device("arn:2")])
            .with_abusive(1);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(follow_event("n1", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert!(harness.push.calls().is_empty());
        assert!(harness.email.calls().is_empty());
        assert_eq!(harness.identity.badge_count(2), 0);
    }

    #[tokio::test]
    async fn live_frequency_sends_singleton_email() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new()
            .with_devices(2, vec![ios_device("arn:2")])
            .with_email_user(2, "user2@example.com", EmailFrequency::Live);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(follow_event("n1", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert_eq!(harness.push.calls().len(), 1);
        let emails = harness.email.calls();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].user_id, 2);
        assert_eq!(emails[0].frequency, EmailFrequency::Live);
        assert_eq!(emails[0].notifications.len(), 1);
    }

    #[tokio::test]
    async fn playlist_repost_uses_playlist_title() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(3, "user_3"))
            .with_user(test_user(2, "user_2"))
            .with_playlist(Playlist {
                playlist_id: 11,
                playlist_name: "Summer Jams".to_string(),
                playlist_owner_id: 2,
                is_album: false,
            });
        let identity = FakeIdentityStore::new().with_devices(2, vec![ios_device("arn:2")]);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        pending.append(NotificationEvent {
            id: "r1".to_string(),
            kind: "repost".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: "3".to_string(),
            group_id: "repost:playlist:11".to_string(),
            data: serde_json::json!({
                "type": "playlist",
                "user_id": 3,
                "repost_item_id": 11
            }),
            user_ids: vec![2],
        });
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        let calls = harness.push.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.title, "New Repost");
        assert_eq!(calls[0].1.body, "user_3 reposted your playlist Summer Jams");
    }

    #[tokio::test]
    async fn one_bad_event_does_not_block_the_batch() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new().with_devices(2, vec![ios_device("arn:2")]);
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let pending = PendingBatch::new();
        // Unmapped type: filtered out, not fatal.
        pending.append(NotificationEvent {
            kind: "brand_new_type".to_string(),
            ..follow_event("x1", 1, 2)
        });
        pending.append(follow_event("n1", 1, 2));
        let processor = BatchProcessor::new(pending, harness.ctx(), Duration::from_millis(500));
        processor.tick().await;

        assert_eq!(harness.push.calls().len(), 1);
    }
}
