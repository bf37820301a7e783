//! Scheduled email aggregation job.
//!
//! Per frequency tier: page over eligible recipients, gather every
//! qualifying notification row and unread DM event in the tier's window,
//! group per recipient, fold duplicate DM senders, and send one digest per
//! recipient. Runs independently of the push pipeline; the only shared
//! state is the store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::config::DigestConfig;
use crate::db::models::{DmEvent, EmailFrequency, EmailUser, NotificationEvent};
use crate::error::AppResult;
use crate::notifications::{
    map_event, DispatchContext, EmailResources, Message, MessageReaction, NotificationKind,
    TypedNotification,
};
use crate::services::mailer::{EmailSendOutcome, NotificationEmail};

/// Remote-config feature gating which kinds may appear in digests.
const EMAIL_FLAG_FEATURE: &str = "notification_emails";

/// Hard cap on eligibility pages per run, beyond the zero-row exit, so a
/// misbehaving query cannot loop forever.
const MAX_PAGES_PER_RUN: usize = 10_000;

/// Per-user outcome classification for the run tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEmailOutcome {
    Sent,
    ShouldSkip,
    Error,
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: UserEmailOutcome) {
        match outcome {
            UserEmailOutcome::Sent => self.sent += 1,
            UserEmailOutcome::ShouldSkip => self.skipped += 1,
            UserEmailOutcome::Error => self.errors += 1,
        }
    }
}

pub struct EmailAggregationJob {
    ctx: DispatchContext,
    config: DigestConfig,
}

impl EmailAggregationJob {
    pub fn new(ctx: DispatchContext, config: DigestConfig) -> Self {
        Self { ctx, config }
    }

    fn interval_for(&self, frequency: EmailFrequency) -> Duration {
        match frequency {
            EmailFrequency::Live => Duration::from_secs(self.config.live_interval_seconds),
            EmailFrequency::Daily => Duration::from_secs(self.config.daily_interval_seconds),
            EmailFrequency::Weekly => Duration::from_secs(self.config.weekly_interval_seconds),
            EmailFrequency::Off => Duration::from_secs(3600),
        }
    }

    /// Window of rows a digest covers: one day for live/daily, seven for
    /// weekly.
    fn window_for(frequency: EmailFrequency) -> chrono::Duration {
        match frequency {
            EmailFrequency::Weekly => chrono::Duration::days(7),
            _ => chrono::Duration::days(1),
        }
    }

    /// Minimum gap since the last digest at this tier.
    fn cooldown_for(&self, frequency: EmailFrequency) -> chrono::Duration {
        match frequency {
            EmailFrequency::Live => {
                chrono::Duration::seconds(self.config.live_interval_seconds as i64)
            }
            EmailFrequency::Daily => chrono::Duration::days(1),
            EmailFrequency::Weekly => chrono::Duration::days(7),
            EmailFrequency::Off => chrono::Duration::zero(),
        }
    }

    pub async fn run(
        &self,
        frequency: EmailFrequency,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) {
        let interval = self.interval_for(frequency);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("{} email job shutting down", frequency.as_str());
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let now = chrono::Utc::now().naive_utc();
            match self.run_tier(frequency, now).await {
                Ok(summary) => {
                    tracing::info!(
                        "{} email run finished: {} sent, {} skipped, {} errors",
                        frequency.as_str(),
                        summary.sent,
                        summary.skipped,
                        summary.errors
                    );
                }
                Err(e) => {
                    tracing::warn!("{} email run failed: {:?}", frequency.as_str(), e);
                }
            }
        }
    }

    /// One aggregation run for a tier. Pages until a page comes back empty,
    /// the page cap is hit, or the wall-clock ceiling expires (checked
    /// between pages, never mid-user).
    pub async fn run_tier(
        &self,
        frequency: EmailFrequency,
        now: NaiveDateTime,
    ) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();
        if frequency == EmailFrequency::Off {
            return Ok(summary);
        }

        let start_offset = now - Self::window_for(frequency);
        let emailed_before = now - self.cooldown_for(frequency);
        let deadline = Instant::now() + Duration::from_secs(self.config.max_run_seconds);

        let kinds = self.email_enabled_kinds().await;
        let mut last_user_id = 0;

        for _ in 0..MAX_PAGES_PER_RUN {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "{} email run hit the {}s ceiling; aborting until next schedule",
                    frequency.as_str(),
                    self.config.max_run_seconds
                );
                break;
            }

            let page = self
                .ctx
                .identity
                .eligible_email_users(frequency, emailed_before, last_user_id, self.config.page_size)
                .await?;
            if page.is_empty() {
                break;
            }
            last_user_id = page.last().map(|u| u.user_id).unwrap_or(last_user_id);

            self.process_page(frequency, &page, start_offset, now, &kinds, &mut summary)
                .await;
        }

        Ok(summary)
    }

    /// Kinds whose email rollout flag is on. Fail-open: an unreachable flag
    /// service keeps every kind eligible.
    async fn email_enabled_kinds(&self) -> Vec<String> {
        let mut kinds = Vec::new();
        for kind in NotificationKind::email_row_kinds() {
            if self
                .ctx
                .flags
                .feature_variable_enabled(EMAIL_FLAG_FEATURE, kind.as_str())
                .await
            {
                kinds.push(kind.as_str().to_string());
            }
        }
        kinds
    }

    async fn process_page(
        &self,
        frequency: EmailFrequency,
        page: &[EmailUser],
        start: NaiveDateTime,
        now: NaiveDateTime,
        kinds: &[String],
        summary: &mut RunSummary,
    ) {
        let ids: Vec<i32> = page.iter().map(|u| u.user_id).collect();

        let gathered = futures::try_join!(
            self.ctx.identity.settings_for_users(&ids),
            self.ctx.discovery.notifications_in_window(start, now, kinds),
            self.ctx.discovery.unread_messages(start, now),
            self.ctx.discovery.unread_reactions(start, now),
        );
        let (bundle, rows, messages, reactions) = match gathered {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!("Failed to gather digest inputs for page: {:?}", e);
                summary.errors += page.len();
                return;
            }
        };

        for user in page {
            let settings = bundle.get(user.user_id);
            let should_email = settings.email.is_some()
                && !settings.is_abusive
                && settings.email_frequency == frequency;

            let outcome = if !should_email {
                UserEmailOutcome::ShouldSkip
            } else {
                match self
                    .send_digest(user, frequency, &rows, &messages, &reactions, now)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!("Digest for user {} failed: {:?}", user.user_id, e);
                        UserEmailOutcome::Error
                    }
                }
            };
            summary.record(outcome);
        }
    }

    async fn send_digest(
        &self,
        user: &EmailUser,
        frequency: EmailFrequency,
        rows: &[NotificationEvent],
        messages: &[DmEvent],
        reactions: &[DmEvent],
        now: NaiveDateTime,
    ) -> AppResult<UserEmailOutcome> {
        let mut entries = build_user_entries(user.user_id, rows, messages, reactions);
        if entries.is_empty() {
            return Ok(UserEmailOutcome::ShouldSkip);
        }
        entries.truncate(self.config.max_notifications_per_email);

        let resources = self.gather_resources(&entries).await?;
        let formatted: Vec<_> = entries
            .iter()
            .filter_map(|n| n.format_for_email(&resources))
            .collect();
        if formatted.is_empty() {
            return Ok(UserEmailOutcome::ShouldSkip);
        }

        let request = NotificationEmail {
            user_id: user.user_id,
            email: user.email.clone(),
            frequency,
            notifications: formatted,
            send_at: None,
        };

        match self.ctx.email.send_notification_email(&request).await? {
            EmailSendOutcome::Sent => {
                self.ctx
                    .identity
                    .record_email_sent(user.user_id, frequency, now)
                    .await?;
                Ok(UserEmailOutcome::Sent)
            }
            EmailSendOutcome::NothingToSend => Ok(UserEmailOutcome::ShouldSkip),
            EmailSendOutcome::Failed => Ok(UserEmailOutcome::Error),
        }
    }

    /// Batched entity resolution for the entries of one digest: one query
    /// per entity type across all entries.
    async fn gather_resources(&self, entries: &[TypedNotification]) -> AppResult<EmailResources> {
        let mut user_ids = Vec::new();
        let mut track_ids = Vec::new();
        let mut playlist_ids = Vec::new();
        for entry in entries {
            let ids = entry.resource_ids();
            user_ids.extend(ids.user_ids);
            track_ids.extend(ids.track_ids);
            playlist_ids.extend(ids.playlist_ids);
        }
        user_ids.sort_unstable();
        user_ids.dedup();
        track_ids.sort_unstable();
        track_ids.dedup();
        playlist_ids.sort_unstable();
        playlist_ids.dedup();

        let (users, tracks, playlists) = futures::try_join!(
            self.ctx.discovery.users_by_ids(&user_ids),
            self.ctx.discovery.tracks_by_ids(&track_ids),
            self.ctx.discovery.playlists_by_ids(&playlist_ids),
        )?;

        Ok(EmailResources {
            users: users.into_iter().map(|u| (u.user_id, u)).collect(),
            tracks: tracks.into_iter().map(|t| (t.track_id, t)).collect(),
            playlists: playlists.into_iter().map(|p| (p.playlist_id, p)).collect(),
        })
    }
}

/// Group one user's raw rows and DM events into ordered digest entries.
///
/// Row events sharing a (kind, group id) collapse into one entry carrying an
/// "N others" count. DM events collapse per sender: several unread messages
/// from one sender become a single entry flagged `multiple`.
pub fn build_user_entries(
    user_id: i32,
    rows: &[NotificationEvent],
    messages: &[DmEvent],
    reactions: &[DmEvent],
) -> Vec<TypedNotification> {
    let mut entries: Vec<TypedNotification> = Vec::new();

    // Insertion-ordered grouping of row events addressed to this user.
    let mut group_index: HashMap<(String, String), usize> = HashMap::new();
    let mut group_extras: HashMap<usize, usize> = HashMap::new();
    for row in rows.iter().filter(|r| r.user_ids.contains(&user_id)) {
        let key = (row.kind.clone(), row.group_id.clone());
        if let Some(&index) = group_index.get(&key) {
            *group_extras.entry(index).or_insert(0) += 1;
            continue;
        }
        if let Some(mapped) = map_event(row) {
            group_index.insert(key, entries.len());
            entries.push(mapped);
        }
    }
    for (index, extras) in group_extras {
        entries[index].set_additional_count(extras);
    }

    // One Message entry per sender; `multiple` when folded.
    let mut message_senders: HashMap<i32, (usize, NaiveDateTime)> = HashMap::new();
    for event in messages.iter().filter(|m| m.receiver_user_id == user_id) {
        message_senders
            .entry(event.sender_user_id)
            .and_modify(|(count, latest)| {
                *count += 1;
                *latest = (*latest).max(event.created_at);
            })
            .or_insert((1, event.created_at));
    }
    let mut message_entries: Vec<_> = message_senders.into_iter().collect();
    message_entries.sort_by_key(|(sender, _)| *sender);
    for (sender, (count, latest)) in message_entries {
        entries.push(TypedNotification::Message(Message {
            sender_user_id: sender,
            receiver_user_id: user_id,
            multiple: count > 1,
            timestamp: latest,
        }));
    }

    let mut reaction_senders: HashMap<i32, (usize, NaiveDateTime)> = HashMap::new();
    for event in reactions.iter().filter(|r| r.receiver_user_id == user_id) {
        reaction_senders
            .entry(event.sender_user_id)
            .and_modify(|(count, latest)| {
                *count += 1;
                *latest = (*latest).max(event.created_at);
            })
            .or_insert((1, event.created_at));
    }
    let mut reaction_entries: Vec<_> = reaction_senders.into_iter().collect();
    reaction_entries.sort_by_key(|(sender, _)| *sender);
    for (sender, (count, latest)) in reaction_entries {
        entries.push(TypedNotification::MessageReaction(MessageReaction {
            sender_user_id: sender,
            receiver_user_id: user_id,
            multiple: count > 1,
            timestamp: latest,
        }));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn dm(message_id: &str, sender: i32, receiver: i32) -> DmEvent {
        DmEvent {
            chat_id: "chat1".to_string(),
            message_id: message_id.to_string(),
            sender_user_id: sender,
            receiver_user_id: receiver,
            created_at: at(1),
        }
    }

    fn follow_row(id: &str, follower: i32, receiver: i32, group_id: &str) -> NotificationEvent {
        NotificationEvent {
            id: id.to_string(),
            kind: "follow".to_string(),
            timestamp: at(1),
            specifier: follower.to_string(),
            group_id: group_id.to_string(),
            data: serde_json::json!({"follower_user_id": follower}),
            user_ids: vec![receiver],
        }
    }

    #[test]
    fn dm_events_from_one_sender_fold_into_one_entry() {
        // 2 unread messages + 1 reaction from sender 1: exactly one Message
        // entry with multiple=true and one Reaction entry.
        let entries = build_user_entries(
            2,
            &[],
            &[dm("m1", 1, 2), dm("m2", 1, 2)],
            &[dm("m1", 1, 2)],
        );

        assert_eq!(entries.len(), 2);
        match &entries[0] {
            TypedNotification::Message(m) => {
                assert!(m.multiple);
                assert_eq!(m.sender_user_id, 1);
            }
            other => panic!("expected Message, got {}", other.kind_str()),
        }
        match &entries[1] {
            TypedNotification::MessageReaction(r) => {
                assert!(!r.multiple);
                assert_eq!(r.sender_user_id, 1);
            }
            other => panic!("expected MessageReaction, got {}", other.kind_str()),
        }
    }

    #[test]
    fn same_group_rows_collapse_with_count() {
        let rows = vec![
            follow_row("n1", 1, 2, "follow:2"),
            follow_row("n2", 3, 2, "follow:2"),
            follow_row("n3", 4, 2, "follow:2"),
        ];
        let entries = build_user_entries(2, &rows, &[], &[]);
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            TypedNotification::Follow(f) => {
                assert_eq!(f.follower_user_id, 1);
                assert_eq!(f.additional_count, 2);
            }
            other => panic!("expected Follow, got {}", other.kind_str()),
        }
    }

    #[test]
    fn rows_for_other_users_are_ignored() {
        let rows = vec![follow_row("n1", 1, 9, "follow:9")];
        assert!(build_user_entries(2, &rows, &[], &[]).is_empty());
    }

    #[tokio::test]
    async fn digest_sends_and_respects_cooldown() {
        let discovery = FakeDiscoveryStore::new()
            .with_user(test_user(1, "user_1"))
            .with_user(test_user(2, "user_2"))
            .with_notification_row(follow_row("n1", 1, 2, "follow:2"));
        let identity = FakeIdentityStore::new().with_email_user(
            2,
            "user2@example.com",
            EmailFrequency::Daily,
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let job = EmailAggregationJob::new(harness.ctx(), Config::default().digest);

        let first = job.run_tier(EmailFrequency::Daily, at(6)).await.unwrap();
        assert_eq!(first.sent, 1);
        assert_eq!(harness.email.calls().len(), 1);
        let sent = &harness.email.calls()[0];
        assert_eq!(sent.user_id, 2);
        assert_eq!(sent.notifications.len(), 1);

        // Second run inside the daily cooldown: user is not eligible again.
        let second = job.run_tier(EmailFrequency::Daily, at(8)).await.unwrap();
        assert_eq!(second.sent, 0);
        assert_eq!(harness.email.calls().len(), 1);
    }

    #[tokio::test]
    async fn digest_caps_entries_at_configured_max() {
        let mut discovery = FakeDiscoveryStore::new().with_user(test_user(2, "user_2"));
        for i in 0..8 {
            let follower = 10 + i;
            discovery = discovery
                .with_user(test_user(follower, &format!("user_{}", follower)))
                .with_notification_row(follow_row(
                    &format!("n{}", i),
                    follower,
                    2,
                    &format!("follow:2:{}", i),
                ));
        }
        let identity = FakeIdentityStore::new().with_email_user(
            2,
            "user2@example.com",
            EmailFrequency::Daily,
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let job = EmailAggregationJob::new(harness.ctx(), Config::default().digest);
        let summary = job.run_tier(EmailFrequency::Daily, at(6)).await.unwrap();
        assert_eq!(summary.sent, 1);

        let sent = &harness.email.calls()[0];
        assert_eq!(sent.notifications.len(), 5);
    }

    #[tokio::test]
    async fn user_with_nothing_to_send_is_skipped() {
        let discovery = FakeDiscoveryStore::new().with_user(test_user(2, "user_2"));
        let identity = FakeIdentityStore::new().with_email_user(
            2,
            "user2@example.com",
            EmailFrequency::Daily,
        );
        let push = FakePushTransport::new();
        let harness = TestHarness::new(discovery, identity, push);

        let job = EmailAggregationJob::new(harness.ctx(), Config::default().digest);
        let summary = job.run_tier(EmailFrequency::Daily, at(6)).await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.skipped, 1);
        assert!(harness.email.calls().is_empty());
    }
}
