//! In-memory fakes of the collaborator interfaces, shared by the unit tests
//! across the pipeline modules.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::db::models::*;
use crate::error::AppResult;
use crate::notifications::DispatchContext;
use crate::services::flags::StaticFlags;
use crate::services::mailer::{EmailSendOutcome, EmailTransport, NotificationEmail};
use crate::services::push::{PushMessage, PushTarget, PushTransport};
pub use crate::store::{CursorStore, DiscoveryStore, IdentityStore};

pub fn test_user(user_id: i32, handle: &str) -> User {
    User {
        user_id,
        handle: handle.to_string(),
        name: None,
        is_deactivated: false,
    }
}

pub fn test_track(track_id: i32, title: &str, owner_id: i32) -> Track {
    Track {
        track_id,
        title: title.to_string(),
        owner_id,
    }
}

#[derive(Default)]
pub struct FakeDiscoveryStore {
    users: HashMap<i32, User>,
    tracks: HashMap<i32, Track>,
    playlists: HashMap<i32, Playlist>,
    notification_rows: Vec<NotificationEvent>,
    messages: Vec<DmEvent>,
    reactions: Vec<DmEvent>,
}

impl FakeDiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.user_id, user);
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.insert(track.track_id, track);
        self
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlists.insert(playlist.playlist_id, playlist);
        self
    }

    pub fn with_notification_row(mut self, row: NotificationEvent) -> Self {
        self.notification_rows.push(row);
        self
    }

    pub fn with_messages(mut self, messages: Vec<DmEvent>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_reactions(mut self, reactions: Vec<DmEvent>) -> Self {
        self.reactions = reactions;
        self
    }
}

#[async_trait]
impl DiscoveryStore for FakeDiscoveryStore {
    async fn users_by_ids(&self, ids: &[i32]) -> AppResult<Vec<User>> {
        Ok(ids.iter().filter_map(|id| self.users.get(id).cloned()).collect())
    }

    async fn tracks_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Track>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.tracks.get(id).cloned())
            .collect())
    }

    async fn playlists_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Playlist>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.playlists.get(id).cloned())
            .collect())
    }

    async fn notifications_in_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kinds: &[String],
    ) -> AppResult<Vec<NotificationEvent>> {
        Ok(self
            .notification_rows
            .iter()
            .filter(|r| r.timestamp > start && r.timestamp <= end && kinds.contains(&r.kind))
            .cloned()
            .collect())
    }

    async fn unread_messages(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.created_at > min && m.created_at <= max)
            .cloned()
            .collect())
    }

    async fn unread_reactions(
        &self,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        Ok(self
            .reactions
            .iter()
            .filter(|r| r.created_at > min && r.created_at <= max)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeIdentityStore {
    devices: HashMap<i32, Vec<PushDevice>>,
    toggles: HashMap<i32, NotificationToggles>,
    abusive: HashSet<i32>,
    email_settings: HashMap<i32, (String, EmailFrequency)>,
    badges: Mutex<HashMap<i32, i64>>,
    emailed_at: Mutex<HashMap<i32, NaiveDateTime>>,
}

impl FakeIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(mut self, user_id: i32, devices: Vec<PushDevice>) -> Self {
        self.devices.insert(user_id, devices);
        self
    }

    pub fn with_toggle(
        mut self,
        user_id: i32,
        update: impl FnOnce(&mut NotificationToggles),
    ) -> Self {
        let toggles = self.toggles.entry(user_id).or_default();
        update(toggles);
        self
    }

    pub fn with_abusive(mut self, user_id: i32) -> Self {
        self.abusive.insert(user_id);
        self
    }

    pub fn with_email_user(mut self, user_id: i32, email: &str, frequency: EmailFrequency) -> Self {
        self.email_settings
            .insert(user_id, (email.to_string(), frequency));
        self
    }

    pub fn badge_count(&self, user_id: i32) -> i64 {
        *self.badges.lock().unwrap().get(&user_id).unwrap_or(&0)
    }
}

#[async_trait]
impl IdentityStore for FakeIdentityStore {
    async fn settings_for_users(&self, ids: &[i32]) -> AppResult<SettingsBundle> {
        let badges = self.badges.lock().unwrap();
        let mut bundle = SettingsBundle::default();
        for &id in ids {
            let mut settings = UserNotificationSettings::empty(id);
            if let Some(devices) = self.devices.get(&id) {
                settings.devices = devices.clone();
            }
            if let Some(toggles) = self.toggles.get(&id) {
                settings.toggles = toggles.clone();
            }
            settings.is_abusive = self.abusive.contains(&id);
            settings.badge_count = *badges.get(&id).unwrap_or(&0);
            if let Some((email, frequency)) = self.email_settings.get(&id) {
                settings.email = Some(email.clone());
                settings.email_frequency = *frequency;
            }
            bundle.by_user.insert(id, settings);
        }
        Ok(bundle)
    }

    async fn increment_badge(&self, user_id: i32) -> AppResult<()> {
        *self.badges.lock().unwrap().entry(user_id).or_insert(0) += 1;
        Ok(())
    }

    async fn eligible_email_users(
        &self,
        frequency: EmailFrequency,
        emailed_before: NaiveDateTime,
        last_user_id: i32,
        limit: i64,
    ) -> AppResult<Vec<EmailUser>> {
        let emailed_at = self.emailed_at.lock().unwrap();
        let mut eligible: Vec<EmailUser> = self
            .email_settings
            .iter()
            .filter(|(id, (_, freq))| {
                **id > last_user_id
                    && *freq == frequency
                    && emailed_at.get(id).map(|t| *t <= emailed_before).unwrap_or(true)
            })
            .map(|(id, (email, _))| EmailUser {
                user_id: *id,
                email: email.clone(),
            })
            .collect();
        eligible.sort_by_key(|u| u.user_id);
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn record_email_sent(
        &self,
        user_id: i32,
        _frequency: EmailFrequency,
        sent_at: NaiveDateTime,
    ) -> AppResult<()> {
        self.emailed_at.lock().unwrap().insert(user_id, sent_at);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePushTransport {
    calls: Mutex<Vec<(PushTarget, PushMessage)>>,
}

impl FakePushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(PushTarget, PushMessage)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for FakePushTransport {
    async fn send_push(&self, target: &PushTarget, message: &PushMessage) -> AppResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((target.clone(), message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEmailTransport {
    calls: Mutex<Vec<NotificationEmail>>,
}

impl FakeEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotificationEmail> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailTransport for FakeEmailTransport {
    async fn send_notification_email(
        &self,
        request: &NotificationEmail,
    ) -> AppResult<EmailSendOutcome> {
        if request.notifications.is_empty() {
            return Ok(EmailSendOutcome::NothingToSend);
        }
        self.calls.lock().unwrap().push(request.clone());
        Ok(EmailSendOutcome::Sent)
    }
}

#[derive(Default)]
pub struct FakeCursorStore {
    values: Mutex<HashMap<String, String>>,
}

impl FakeCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for FakeCursorStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Bundles the fakes and hands out a `DispatchContext` wired to them.
pub struct TestHarness {
    pub discovery: Arc<FakeDiscoveryStore>,
    pub identity: Arc<FakeIdentityStore>,
    pub push: Arc<FakePushTransport>,
    pub email: Arc<FakeEmailTransport>,
}

impl TestHarness {
    pub fn new(
        discovery: FakeDiscoveryStore,
        identity: FakeIdentityStore,
        push: FakePushTransport,
    ) -> Self {
        Self {
            discovery: Arc::new(discovery),
            identity: Arc::new(identity),
            push: Arc::new(push),
            email: Arc::new(FakeEmailTransport::new()),
        }
    }

    pub fn ctx(&self) -> DispatchContext {
        DispatchContext {
            discovery: self.discovery.clone(),
            identity: self.identity.clone(),
            push: self.push.clone(),
            email: self.email.clone(),
            flags: Arc::new(StaticFlags),
        }
    }
}
