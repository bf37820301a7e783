//! Collaborator interfaces the notification pipeline depends on, plus their
//! Postgres-backed implementations. The pipeline only ever sees the traits,
//! so tests can swap in in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::db::models::*;
use crate::db::repository::*;
use crate::error::AppResult;

/// Discovery-store reads: entities, notification rows, unread DM events.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    async fn users_by_ids(&self, ids: &[i32]) -> AppResult<Vec<User>>;
    async fn tracks_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Track>>;
    async fn playlists_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Playlist>>;
    async fn notifications_in_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kinds: &[String],
    ) -> AppResult<Vec<NotificationEvent>>;
    async fn unread_messages(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>>;
    async fn unread_reactions(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>>;
}

/// Identity-store reads and writes: settings, badges, email bookkeeping.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn settings_for_users(&self, ids: &[i32]) -> AppResult<SettingsBundle>;
    async fn increment_badge(&self, user_id: i32) -> AppResult<()>;
    async fn eligible_email_users(
        &self,
        frequency: EmailFrequency,
        emailed_before: NaiveDateTime,
        last_user_id: i32,
        limit: i64,
    ) -> AppResult<Vec<EmailUser>>;
    async fn record_email_sent(
        &self,
        user_id: i32,
        frequency: EmailFrequency,
        sent_at: NaiveDateTime,
    ) -> AppResult<()>;
}

/// Key/value watermark persistence for the DM poll task.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

pub struct PgDiscoveryStore {
    pool: PgPool,
}

impl PgDiscoveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiscoveryStore for PgDiscoveryStore {
    async fn users_by_ids(&self, ids: &[i32]) -> AppResult<Vec<User>> {
        UserRepository::find_by_ids(&self.pool, ids).await
    }

    async fn tracks_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Track>> {
        TrackRepository::find_by_ids(&self.pool, ids).await
    }

    async fn playlists_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Playlist>> {
        PlaylistRepository::find_by_ids(&self.pool, ids).await
    }

    async fn notifications_in_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kinds: &[String],
    ) -> AppResult<Vec<NotificationEvent>> {
        NotificationRepository::find_in_window(&self.pool, start, end, kinds).await
    }

    async fn unread_messages(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        DmRepository::unread_messages(&self.pool, min, max).await
    }

    async fn unread_reactions(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        DmRepository::unread_reactions(&self.pool, min, max).await
    }
}

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn settings_for_users(&self, ids: &[i32]) -> AppResult<SettingsBundle> {
        SettingsRepository::settings_for_users(&self.pool, ids).await
    }

    async fn increment_badge(&self, user_id: i32) -> AppResult<()> {
        SettingsRepository::increment_badge(&self.pool, user_id).await
    }

    async fn eligible_email_users(
        &self,
        frequency: EmailFrequency,
        emailed_before: NaiveDateTime,
        last_user_id: i32,
        limit: i64,
    ) -> AppResult<Vec<EmailUser>> {
        SettingsRepository::eligible_email_users(
            &self.pool,
            frequency,
            emailed_before,
            last_user_id,
            limit,
        )
        .await
    }

    async fn record_email_sent(
        &self,
        user_id: i32,
        frequency: EmailFrequency,
        sent_at: NaiveDateTime,
    ) -> AppResult<()> {
        SettingsRepository::record_email_sent(&self.pool, user_id, frequency, sent_at).await
    }
}

pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        CursorRepository::get(&self.pool, key).await
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        CursorRepository::set(&self.pool, key, value).await
    }
}
