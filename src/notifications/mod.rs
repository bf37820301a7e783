//! Typed notifications: the closed set of event kinds, the mapper from raw
//! rows, and the per-kind handlers behind a single tagged union.
//!
//! Unknown wire strings are handled once, at the decode boundary; everything
//! past `map_event` is exhaustively matched.

pub mod format;

mod announcement;
mod challenge;
mod create;
mod follow;
mod message;
mod milestone;
mod playlist;
mod purchase;
mod reaction;
mod remix;
mod repost;
mod save;
mod supporter;
mod tastemaker;
mod tip;
mod trending;
mod withdrawal;

pub use announcement::Announcement;
pub use challenge::ChallengeReward;
pub use create::Create;
pub use follow::Follow;
pub use message::{Message, MessageReaction};
pub use milestone::{Milestone, MilestoneKind};
pub use playlist::AddTrackToPlaylist;
pub use purchase::{UsdcPurchaseBuyer, UsdcPurchaseSeller};
pub use reaction::Reaction;
pub use remix::{Cosign, Remix};
pub use repost::{Repost, RepostOfRepost};
pub use save::{Save, SaveOfRepost};
pub use supporter::{SupporterDethroned, SupporterRankUp, SupportingRankUp};
pub use tastemaker::Tastemaker;
pub use tip::{TipReceive, TipSend};
pub use trending::TrendingTrack;
pub use withdrawal::UsdcWithdrawal;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::db::models::{
    EmailFrequency, NotificationCategory, NotificationEvent, Playlist, Track, User,
    UserNotificationSettings,
};
use crate::error::AppResult;
use crate::services::flags::RemoteFlags;
use crate::services::mailer::{EmailTransport, NotificationEmail};
use crate::services::push::{PushMessage, PushTarget, PushTransport};
use crate::store::{DiscoveryStore, IdentityStore};

/// Wire discriminants for row-backed notification kinds. Message kinds also
/// appear here because the DM path feeds pre-shaped events through the same
/// mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Follow,
    Repost,
    Save,
    Remix,
    Cosign,
    Create,
    Milestone,
    TrackAddedToPlaylist,
    Announcement,
    Reaction,
    TipSend,
    TipReceive,
    SupporterRankUp,
    SupportingRankUp,
    SupporterDethroned,
    ChallengeReward,
    Tastemaker,
    Trending,
    UsdcPurchaseBuyer,
    UsdcPurchaseSeller,
    UsdcWithdrawal,
    Message,
    MessageReaction,
}

impl NotificationKind {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "follow" => Some(NotificationKind::Follow),
            "repost" => Some(NotificationKind::Repost),
            "save" => Some(NotificationKind::Save),
            "remix" => Some(NotificationKind::Remix),
            "cosign" => Some(NotificationKind::Cosign),
            "create" => Some(NotificationKind::Create),
            "milestone" => Some(NotificationKind::Milestone),
            "track_added_to_playlist" => Some(NotificationKind::TrackAddedToPlaylist),
            "announcement" => Some(NotificationKind::Announcement),
            "reaction" => Some(NotificationKind::Reaction),
            "tip_send" => Some(NotificationKind::TipSend),
            "tip_receive" => Some(NotificationKind::TipReceive),
            "supporter_rank_up" => Some(NotificationKind::SupporterRankUp),
            "supporting_rank_up" => Some(NotificationKind::SupportingRankUp),
            "supporter_dethroned" => Some(NotificationKind::SupporterDethroned),
            "challenge_reward" => Some(NotificationKind::ChallengeReward),
            "tastemaker" => Some(NotificationKind::Tastemaker),
            "trending" => Some(NotificationKind::Trending),
            "usdc_purchase_buyer" => Some(NotificationKind::UsdcPurchaseBuyer),
            "usdc_purchase_seller" => Some(NotificationKind::UsdcPurchaseSeller),
            "usdc_withdrawal" => Some(NotificationKind::UsdcWithdrawal),
            "message" => Some(NotificationKind::Message),
            "message_reaction" => Some(NotificationKind::MessageReaction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Repost => "repost",
            NotificationKind::Save => "save",
            NotificationKind::Remix => "remix",
            NotificationKind::Cosign => "cosign",
            NotificationKind::Create => "create",
            NotificationKind::Milestone => "milestone",
            NotificationKind::TrackAddedToPlaylist => "track_added_to_playlist",
            NotificationKind::Announcement => "announcement",
            NotificationKind::Reaction => "reaction",
            NotificationKind::TipSend => "tip_send",
            NotificationKind::TipReceive => "tip_receive",
            NotificationKind::SupporterRankUp => "supporter_rank_up",
            NotificationKind::SupportingRankUp => "supporting_rank_up",
            NotificationKind::SupporterDethroned => "supporter_dethroned",
            NotificationKind::ChallengeReward => "challenge_reward",
            NotificationKind::Tastemaker => "tastemaker",
            NotificationKind::Trending => "trending",
            NotificationKind::UsdcPurchaseBuyer => "usdc_purchase_buyer",
            NotificationKind::UsdcPurchaseSeller => "usdc_purchase_seller",
            NotificationKind::UsdcWithdrawal => "usdc_withdrawal",
            NotificationKind::Message => "message",
            NotificationKind::MessageReaction => "message_reaction",
        }
    }

    /// Kinds that live in the `notification` table and can appear in digest
    /// emails. Message kinds come from the chat tables instead.
    pub fn email_row_kinds() -> &'static [NotificationKind] {
        &[
            NotificationKind::Follow,
            NotificationKind::Repost,
            NotificationKind::Save,
            NotificationKind::Remix,
            NotificationKind::Cosign,
            NotificationKind::Create,
            NotificationKind::Milestone,
            NotificationKind::TrackAddedToPlaylist,
            NotificationKind::Announcement,
            NotificationKind::Reaction,
            NotificationKind::TipSend,
            NotificationKind::TipReceive,
            NotificationKind::SupporterRankUp,
            NotificationKind::SupportingRankUp,
            NotificationKind::SupporterDethroned,
            NotificationKind::ChallengeReward,
            NotificationKind::Tastemaker,
            NotificationKind::Trending,
            NotificationKind::UsdcPurchaseBuyer,
            NotificationKind::UsdcPurchaseSeller,
            NotificationKind::UsdcWithdrawal,
        ]
    }
}

/// Everything a handler needs to resolve entities and deliver.
#[derive(Clone)]
pub struct DispatchContext {
    pub discovery: Arc<dyn DiscoveryStore>,
    pub identity: Arc<dyn IdentityStore>,
    pub push: Arc<dyn PushTransport>,
    pub email: Arc<dyn EmailTransport>,
    pub flags: Arc<dyn RemoteFlags>,
}

/// Entity ids a notification needs resolved before it can render an email
/// fragment. Batched per digest so formatting never issues its own queries.
#[derive(Debug, Clone, Default)]
pub struct ResourceIds {
    pub user_ids: Vec<i32>,
    pub track_ids: Vec<i32>,
    pub playlist_ids: Vec<i32>,
}

/// Resolved entities for `format_for_email`.
#[derive(Debug, Clone, Default)]
pub struct EmailResources {
    pub users: HashMap<i32, User>,
    pub tracks: HashMap<i32, Track>,
    pub playlists: HashMap<i32, Playlist>,
}

/// One concrete notification, constructed fresh per event per processing
/// pass and discarded after dispatch.
#[derive(Debug, Clone)]
pub enum TypedNotification {
    Follow(Follow),
    Repost(Repost),
    RepostOfRepost(RepostOfRepost),
    Save(Save),
    SaveOfRepost(SaveOfRepost),
    Remix(Remix),
    Cosign(Cosign),
    Create(Create),
    Milestone(Milestone),
    AddTrackToPlaylist(AddTrackToPlaylist),
    Announcement(Announcement),
    Reaction(Reaction),
    TipSend(TipSend),
    TipReceive(TipReceive),
    SupporterRankUp(SupporterRankUp),
    SupportingRankUp(SupportingRankUp),
    SupporterDethroned(SupporterDethroned),
    ChallengeReward(ChallengeReward),
    Tastemaker(Tastemaker),
    TrendingTrack(TrendingTrack),
    UsdcPurchaseBuyer(UsdcPurchaseBuyer),
    UsdcPurchaseSeller(UsdcPurchaseSeller),
    UsdcWithdrawal(UsdcWithdrawal),
    Message(Message),
    MessageReaction(MessageReaction),
}

impl TypedNotification {
    pub fn kind_str(&self) -> &'static str {
        match self {
            TypedNotification::Follow(_) => "follow",
            TypedNotification::Repost(_) => "repost",
            TypedNotification::RepostOfRepost(_) => "repost_of_repost",
            TypedNotification::Save(_) => "save",
            TypedNotification::SaveOfRepost(_) => "save_of_repost",
            TypedNotification::Remix(_) => "remix",
            TypedNotification::Cosign(_) => "cosign",
            TypedNotification::Create(_) => "create",
            TypedNotification::Milestone(_) => "milestone",
            TypedNotification::AddTrackToPlaylist(_) => "track_added_to_playlist",
            TypedNotification::Announcement(_) => "announcement",
            TypedNotification::Reaction(_) => "reaction",
            TypedNotification::TipSend(_) => "tip_send",
            TypedNotification::TipReceive(_) => "tip_receive",
            TypedNotification::SupporterRankUp(_) => "supporter_rank_up",
            TypedNotification::SupportingRankUp(_) => "supporting_rank_up",
            TypedNotification::SupporterDethroned(_) => "supporter_dethroned",
            TypedNotification::ChallengeReward(_) => "challenge_reward",
            TypedNotification::Tastemaker(_) => "tastemaker",
            TypedNotification::TrendingTrack(_) => "trending",
            TypedNotification::UsdcPurchaseBuyer(_) => "usdc_purchase_buyer",
            TypedNotification::UsdcPurchaseSeller(_) => "usdc_purchase_seller",
            TypedNotification::UsdcWithdrawal(_) => "usdc_withdrawal",
            TypedNotification::Message(_) => "message",
            TypedNotification::MessageReaction(_) => "message_reaction",
        }
    }

    /// Push + optional live email. Sequential within a batch; callers catch
    /// per-item errors.
    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        match self {
            TypedNotification::Follow(n) => n.dispatch(ctx).await,
            TypedNotification::Repost(n) => n.dispatch(ctx).await,
            TypedNotification::RepostOfRepost(n) => n.dispatch(ctx).await,
            TypedNotification::Save(n) => n.dispatch(ctx).await,
            TypedNotification::SaveOfRepost(n) => n.dispatch(ctx).await,
            TypedNotification::Remix(n) => n.dispatch(ctx).await,
            TypedNotification::Cosign(n) => n.dispatch(ctx).await,
            TypedNotification::Create(n) => n.dispatch(ctx).await,
            TypedNotification::Milestone(n) => n.dispatch(ctx).await,
            TypedNotification::AddTrackToPlaylist(n) => n.dispatch(ctx).await,
            TypedNotification::Announcement(n) => n.dispatch(ctx).await,
            TypedNotification::Reaction(n) => n.dispatch(ctx).await,
            TypedNotification::TipSend(n) => n.dispatch(ctx).await,
            TypedNotification::TipReceive(n) => n.dispatch(ctx).await,
            TypedNotification::SupporterRankUp(n) => n.dispatch(ctx).await,
            TypedNotification::SupportingRankUp(n) => n.dispatch(ctx).await,
            TypedNotification::SupporterDethroned(n) => n.dispatch(ctx).await,
            TypedNotification::ChallengeReward(n) => n.dispatch(ctx).await,
            TypedNotification::Tastemaker(n) => n.dispatch(ctx).await,
            TypedNotification::TrendingTrack(n) => n.dispatch(ctx).await,
            TypedNotification::UsdcPurchaseBuyer(n) => n.dispatch(ctx).await,
            TypedNotification::UsdcPurchaseSeller(n) => n.dispatch(ctx).await,
            TypedNotification::UsdcWithdrawal(n) => n.dispatch(ctx).await,
            TypedNotification::Message(n) => n.dispatch(ctx).await,
            TypedNotification::MessageReaction(n) => n.dispatch(ctx).await,
        }
    }

    /// Entity ids the email fragment needs resolved.
    pub fn resource_ids(&self) -> ResourceIds {
        match self {
            TypedNotification::Follow(n) => n.resource_ids(),
            TypedNotification::Repost(n) => n.resource_ids(),
            TypedNotification::RepostOfRepost(n) => n.resource_ids(),
            TypedNotification::Save(n) => n.resource_ids(),
            TypedNotification::SaveOfRepost(n) => n.resource_ids(),
            TypedNotification::Remix(n) => n.resource_ids(),
            TypedNotification::Cosign(n) => n.resource_ids(),
            TypedNotification::Create(n) => n.resource_ids(),
            TypedNotification::Milestone(n) => n.resource_ids(),
            TypedNotification::AddTrackToPlaylist(n) => n.resource_ids(),
            TypedNotification::Announcement(n) => n.resource_ids(),
            TypedNotification::Reaction(n) => n.resource_ids(),
            TypedNotification::TipSend(n) => n.resource_ids(),
            TypedNotification::TipReceive(n) => n.resource_ids(),
            TypedNotification::SupporterRankUp(n) => n.resource_ids(),
            TypedNotification::SupportingRankUp(n) => n.resource_ids(),
            TypedNotification::SupporterDethroned(n) => n.resource_ids(),
            TypedNotification::ChallengeReward(n) => n.resource_ids(),
            TypedNotification::Tastemaker(n) => n.resource_ids(),
            TypedNotification::TrendingTrack(n) => n.resource_ids(),
            TypedNotification::UsdcPurchaseBuyer(n) => n.resource_ids(),
            TypedNotification::UsdcPurchaseSeller(n) => n.resource_ids(),
            TypedNotification::UsdcWithdrawal(n) => n.resource_ids(),
            TypedNotification::Message(n) => n.resource_ids(),
            TypedNotification::MessageReaction(n) => n.resource_ids(),
        }
    }

    /// Render payload for the email template service. `None` when a needed
    /// entity is missing from `resources`; the entry is skipped.
    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        match self {
            TypedNotification::Follow(n) => n.format_for_email(resources),
            TypedNotification::Repost(n) => n.format_for_email(resources),
            TypedNotification::RepostOfRepost(n) => n.format_for_email(resources),
            TypedNotification::Save(n) => n.format_for_email(resources),
            TypedNotification::SaveOfRepost(n) => n.format_for_email(resources),
            TypedNotification::Remix(n) => n.format_for_email(resources),
            TypedNotification::Cosign(n) => n.format_for_email(resources),
            TypedNotification::Create(n) => n.format_for_email(resources),
            TypedNotification::Milestone(n) => n.format_for_email(resources),
            TypedNotification::AddTrackToPlaylist(n) => n.format_for_email(resources),
            TypedNotification::Announcement(n) => n.format_for_email(resources),
            TypedNotification::Reaction(n) => n.format_for_email(resources),
            TypedNotification::TipSend(n) => n.format_for_email(resources),
            TypedNotification::TipReceive(n) => n.format_for_email(resources),
            TypedNotification::SupporterRankUp(n) => n.format_for_email(resources),
            TypedNotification::SupportingRankUp(n) => n.format_for_email(resources),
            TypedNotification::SupporterDethroned(n) => n.format_for_email(resources),
            TypedNotification::ChallengeReward(n) => n.format_for_email(resources),
            TypedNotification::Tastemaker(n) => n.format_for_email(resources),
            TypedNotification::TrendingTrack(n) => n.format_for_email(resources),
            TypedNotification::UsdcPurchaseBuyer(n) => n.format_for_email(resources),
            TypedNotification::UsdcPurchaseSeller(n) => n.format_for_email(resources),
            TypedNotification::UsdcWithdrawal(n) => n.format_for_email(resources),
            TypedNotification::Message(n) => n.format_for_email(resources),
            TypedNotification::MessageReaction(n) => n.format_for_email(resources),
        }
    }

    /// Count of same-group notifications folded into this one. Only the
    /// groupable kinds render it ("and N others" in the email path); push
    /// stays per-event.
    pub fn set_additional_count(&mut self, count: usize) {
        match self {
            TypedNotification::Follow(n) => n.additional_count = count,
            TypedNotification::Repost(n) => n.additional_count = count,
            TypedNotification::RepostOfRepost(n) => n.additional_count = count,
            TypedNotification::Save(n) => n.additional_count = count,
            TypedNotification::SaveOfRepost(n) => n.additional_count = count,
            TypedNotification::Create(n) => n.additional_count = count,
            _ => {}
        }
    }
}

/// Map a raw event to its typed notification. Unknown kinds log at info and
/// yield `None`; payloads with missing required fields log at warn and yield
/// `None`.
pub fn map_event(event: &NotificationEvent) -> Option<TypedNotification> {
    let kind = match NotificationKind::from_wire(&event.kind) {
        Some(kind) => kind,
        None => {
            tracing::info!(
                "Skipping notification {} with unmapped type '{}'",
                event.id,
                event.kind
            );
            return None;
        }
    };

    match kind {
        NotificationKind::Follow => Follow::from_event(event).map(TypedNotification::Follow),
        NotificationKind::Repost => repost::from_event(event),
        NotificationKind::Save => save::from_event(event),
        NotificationKind::Remix => Remix::from_event(event).map(TypedNotification::Remix),
        NotificationKind::Cosign => Cosign::from_event(event).map(TypedNotification::Cosign),
        NotificationKind::Create => Create::from_event(event).map(TypedNotification::Create),
        NotificationKind::Milestone => {
            Milestone::from_event(event).map(TypedNotification::Milestone)
        }
        NotificationKind::TrackAddedToPlaylist => {
            AddTrackToPlaylist::from_event(event).map(TypedNotification::AddTrackToPlaylist)
        }
        NotificationKind::Announcement => {
            Announcement::from_event(event).map(TypedNotification::Announcement)
        }
        NotificationKind::Reaction => Reaction::from_event(event).map(TypedNotification::Reaction),
        NotificationKind::TipSend => TipSend::from_event(event).map(TypedNotification::TipSend),
        NotificationKind::TipReceive => {
            TipReceive::from_event(event).map(TypedNotification::TipReceive)
        }
        NotificationKind::SupporterRankUp => {
            SupporterRankUp::from_event(event).map(TypedNotification::SupporterRankUp)
        }
        NotificationKind::SupportingRankUp => {
            SupportingRankUp::from_event(event).map(TypedNotification::SupportingRankUp)
        }
        NotificationKind::SupporterDethroned => {
            SupporterDethroned::from_event(event).map(TypedNotification::SupporterDethroned)
        }
        NotificationKind::ChallengeReward => {
            ChallengeReward::from_event(event).map(TypedNotification::ChallengeReward)
        }
        NotificationKind::Tastemaker => {
            Tastemaker::from_event(event).map(TypedNotification::Tastemaker)
        }
        NotificationKind::Trending => {
            TrendingTrack::from_event(event).map(TypedNotification::TrendingTrack)
        }
        NotificationKind::UsdcPurchaseBuyer => {
            UsdcPurchaseBuyer::from_event(event).map(TypedNotification::UsdcPurchaseBuyer)
        }
        NotificationKind::UsdcPurchaseSeller => {
            UsdcPurchaseSeller::from_event(event).map(TypedNotification::UsdcPurchaseSeller)
        }
        NotificationKind::UsdcWithdrawal => {
            UsdcWithdrawal::from_event(event).map(TypedNotification::UsdcWithdrawal)
        }
        NotificationKind::Message => Message::from_event(event).map(TypedNotification::Message),
        NotificationKind::MessageReaction => {
            MessageReaction::from_event(event).map(TypedNotification::MessageReaction)
        }
    }
}

/// Entity a repost/save/create refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Track,
    Playlist,
    Album,
}

impl EntityType {
    pub fn noun(&self) -> &'static str {
        match self {
            EntityType::Track => "track",
            EntityType::Playlist => "playlist",
            EntityType::Album => "album",
        }
    }
}

/// Resolve the display title of a track or playlist/album. `None` when the
/// entity row is gone; callers skip the notification.
pub(crate) async fn entity_title(
    ctx: &DispatchContext,
    entity: EntityType,
    id: i32,
) -> AppResult<Option<String>> {
    match entity {
        EntityType::Track => {
            let tracks = ctx.discovery.tracks_by_ids(&[id]).await?;
            Ok(tracks.into_iter().next().map(|t| t.title))
        }
        EntityType::Playlist | EntityType::Album => {
            let playlists = ctx.discovery.playlists_by_ids(&[id]).await?;
            Ok(playlists.into_iter().next().map(|p| p.playlist_name))
        }
    }
}

pub(crate) fn parse_data<T: DeserializeOwned>(event: &NotificationEvent) -> Option<T> {
    match serde_json::from_value(event.data.clone()) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(
                "Skipping {} notification {}: bad payload: {}",
                event.kind,
                event.id,
                e
            );
            None
        }
    }
}

pub(crate) fn primary_receiver(event: &NotificationEvent) -> Option<i32> {
    match event.user_ids.first() {
        Some(&id) => Some(id),
        None => {
            tracing::warn!(
                "Skipping {} notification {}: no recipients",
                event.kind,
                event.id
            );
            None
        }
    }
}

pub(crate) fn find_user(users: &[User], id: i32) -> Option<&User> {
    users.iter().find(|u| u.user_id == id)
}

/// Gate and deliver one notification to one receiver: deactivation check,
/// settings resolution, abuse-pair check, then push + badge + live email.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn deliver_to_receiver(
    ctx: &DispatchContext,
    receiver: &User,
    initiator_id: Option<i32>,
    category: NotificationCategory,
    title: &str,
    body: &str,
    data: serde_json::Value,
    email_entry: Option<serde_json::Value>,
) -> AppResult<()> {
    if receiver.is_deactivated {
        return Ok(());
    }

    let mut ids = vec![receiver.user_id];
    if let Some(initiator) = initiator_id {
        ids.push(initiator);
    }
    let bundle = ctx.identity.settings_for_users(&ids).await?;

    let blocked = match initiator_id {
        Some(initiator) => bundle.pair_blocked(initiator, receiver.user_id),
        None => bundle.get(receiver.user_id).is_abusive,
    };
    if blocked {
        tracing::debug!(
            "Skipping notification to user {}: abuse-flagged pair",
            receiver.user_id
        );
        return Ok(());
    }

    let settings = bundle.get(receiver.user_id);
    deliver_with_settings(
        ctx,
        receiver.user_id,
        &settings,
        category,
        title,
        body,
        data,
        email_entry,
    )
    .await
}

/// Delivery against pre-resolved settings, for callers that batched the
/// settings lookup across many receivers.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn deliver_with_settings(
    ctx: &DispatchContext,
    receiver_id: i32,
    settings: &UserNotificationSettings,
    category: NotificationCategory,
    title: &str,
    body: &str,
    data: serde_json::Value,
    email_entry: Option<serde_json::Value>,
) -> AppResult<()> {
    let message = PushMessage {
        title: title.to_string(),
        body: body.to_string(),
        data,
    };

    if settings.toggles.enabled(category) {
        let devices: Vec<_> = settings.enabled_devices().cloned().collect();
        if !devices.is_empty() {
            for device in &devices {
                let target = PushTarget {
                    device_type: device.device_type.clone(),
                    target_arn: device.target_arn.clone(),
                    badge_count: settings.badge_count + 1,
                };
                ctx.push.send_push(&target, &message).await?;
            }
            ctx.identity.increment_badge(receiver_id).await?;
        }
        ctx.push.send_browser_push(receiver_id, &message).await?;
    }

    if settings.email_frequency == EmailFrequency::Live {
        if let (Some(email), Some(entry)) = (settings.email.clone(), email_entry) {
            let request = NotificationEmail {
                user_id: receiver_id,
                email,
                frequency: EmailFrequency::Live,
                notifications: vec![entry],
                send_at: None,
            };
            ctx.email.send_notification_email(&request).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(kind: &str, data: serde_json::Value, user_ids: Vec<i32>) -> NotificationEvent {
        NotificationEvent {
            id: "n1".to_string(),
            kind: kind.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: "1".to_string(),
            group_id: "g1".to_string(),
            data,
            user_ids,
        }
    }

    #[test]
    fn unknown_kind_maps_to_none() {
        let e = event("some_future_type", serde_json::json!({}), vec![1]);
        assert!(map_event(&e).is_none());
    }

    #[test]
    fn follow_event_maps_to_follow() {
        let e = event(
            "follow",
            serde_json::json!({"follower_user_id": 1, "followee_user_id": 2}),
            vec![2],
        );
        match map_event(&e) {
            Some(TypedNotification::Follow(f)) => {
                assert_eq!(f.follower_user_id, 1);
                assert_eq!(f.receiver_user_id, 2);
            }
            other => panic!("expected Follow, got {:?}", other.map(|n| n.kind_str())),
        }
    }

    #[test]
    fn missing_required_fields_map_to_none() {
        let e = event("follow", serde_json::json!({}), vec![2]);
        assert!(map_event(&e).is_none());
    }

    #[test]
    fn repost_flag_selects_repost_of_repost() {
        let e = event(
            "repost",
            serde_json::json!({
                "type": "track",
                "user_id": 3,
                "repost_item_id": 10,
                "is_repost_of_repost": true
            }),
            vec![2],
        );
        match map_event(&e) {
            Some(TypedNotification::RepostOfRepost(_)) => {}
            other => panic!(
                "expected RepostOfRepost, got {:?}",
                other.map(|n| n.kind_str())
            ),
        }
    }

    #[test]
    fn save_flag_selects_save_of_repost() {
        let e = event(
            "save",
            serde_json::json!({
                "type": "track",
                "user_id": 3,
                "save_item_id": 10,
                "is_save_of_repost": true
            }),
            vec![2],
        );
        match map_event(&e) {
            Some(TypedNotification::SaveOfRepost(_)) => {}
            other => panic!(
                "expected SaveOfRepost, got {:?}",
                other.map(|n| n.kind_str())
            ),
        }
    }

    #[test]
    fn every_wire_kind_round_trips() {
        for kind in NotificationKind::email_row_kinds() {
            assert_eq!(NotificationKind::from_wire(kind.as_str()), Some(*kind));
        }
        assert_eq!(
            NotificationKind::from_wire("message"),
            Some(NotificationKind::Message)
        );
        assert_eq!(
            NotificationKind::from_wire("message_reaction"),
            Some(NotificationKind::MessageReaction)
        );
    }
}
