use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct AddTrackToPlaylistData {
    track_id: i32,
    playlist_id: i32,
    playlist_owner_id: i32,
}

/// Someone added the receiver's track to their playlist.
#[derive(Debug, Clone)]
pub struct AddTrackToPlaylist {
    pub track_id: i32,
    pub playlist_id: i32,
    pub playlist_owner_id: i32,
    pub receiver_user_id: i32,
}

impl AddTrackToPlaylist {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: AddTrackToPlaylistData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(AddTrackToPlaylist {
            track_id: data.track_id,
            playlist_id: data.playlist_id,
            playlist_owner_id: data.playlist_owner_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let user_ids = [self.playlist_owner_id, self.receiver_user_id];
        let track_ids = [self.track_id];
        let playlist_ids = [self.playlist_id];
        let (users, tracks, playlists) = futures::try_join!(
            ctx.discovery.users_by_ids(&user_ids),
            ctx.discovery.tracks_by_ids(&track_ids),
            ctx.discovery.playlists_by_ids(&playlist_ids),
        )?;
        let owner = match find_user(&users, self.playlist_owner_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let track = match tracks.first() {
            Some(t) => t,
            None => return Ok(()),
        };
        let playlist = match playlists.first() {
            Some(p) => p,
            None => return Ok(()),
        };

        let body = format!(
            "{} added {} to their playlist {}",
            owner.display_name(),
            track.title,
            playlist.playlist_name
        );
        let email_entry = json!({
            "type": "track_added_to_playlist",
            "users": [{
                "userId": owner.user_id,
                "handle": owner.handle,
                "name": owner.name,
            }],
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "playlist": {"id": self.playlist_id, "name": playlist.playlist_name},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.playlist_owner_id),
            NotificationCategory::Reposts,
            "Your track got on a playlist!",
            &body,
            json!({"type": "track_added_to_playlist", "entityId": self.track_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.playlist_owner_id],
            track_ids: vec![self.track_id],
            playlist_ids: vec![self.playlist_id],
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let owner = resources.users.get(&self.playlist_owner_id)?;
        let track = resources.tracks.get(&self.track_id)?;
        let playlist = resources.playlists.get(&self.playlist_id)?;
        Some(json!({
            "type": "track_added_to_playlist",
            "users": [{
                "userId": owner.user_id,
                "handle": owner.handle,
                "name": owner.name,
            }],
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "playlist": {"id": self.playlist_id, "name": playlist.playlist_name},
            "text": format!(
                "{} added {} to their playlist {}",
                owner.display_name(),
                track.title,
                playlist.playlist_name
            ),
        }))
    }
}
