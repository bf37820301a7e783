use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct RemixData {
    track_id: i32,
    parent_track_id: i32,
    remixer_user_id: i32,
}

/// A new remix of the receiver's track.
#[derive(Debug, Clone)]
pub struct Remix {
    pub track_id: i32,
    pub parent_track_id: i32,
    pub remixer_user_id: i32,
    pub receiver_user_id: i32,
}

impl Remix {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: RemixData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Remix {
            track_id: data.track_id,
            parent_track_id: data.parent_track_id,
            remixer_user_id: data.remixer_user_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let user_ids = [self.remixer_user_id, self.receiver_user_id];
        let track_ids = [self.parent_track_id];
        let (users, tracks) = futures::try_join!(
            ctx.discovery.users_by_ids(&user_ids),
            ctx.discovery.tracks_by_ids(&track_ids),
        )?;
        let remixer = match find_user(&users, self.remixer_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let parent = match tracks.first() {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "{} remixed your track {}",
            remixer.display_name(),
            parent.title
        );
        let email_entry = json!({
            "type": "remix",
            "users": [{
                "userId": remixer.user_id,
                "handle": remixer.handle,
                "name": remixer.name,
            }],
            "entity": {"type": "track", "id": self.parent_track_id, "name": parent.title},
            "remixTrackId": self.track_id,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.remixer_user_id),
            NotificationCategory::Remixes,
            "New Remix",
            &body,
            json!({"type": "remix", "entityId": self.track_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.remixer_user_id],
            track_ids: vec![self.track_id, self.parent_track_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let remixer = resources.users.get(&self.remixer_user_id)?;
        let parent = resources.tracks.get(&self.parent_track_id)?;
        Some(json!({
            "type": "remix",
            "users": [{
                "userId": remixer.user_id,
                "handle": remixer.handle,
                "name": remixer.name,
            }],
            "entity": {"type": "track", "id": self.parent_track_id, "name": parent.title},
            "remixTrackId": self.track_id,
            "text": format!("{} remixed your track {}", remixer.display_name(), parent.title),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CosignData {
    track_id: i32,
    parent_track_owner_id: i32,
}

/// The parent-track owner co-signed the receiver's remix.
#[derive(Debug, Clone)]
pub struct Cosign {
    pub remix_track_id: i32,
    pub cosigner_user_id: i32,
    pub receiver_user_id: i32,
}

impl Cosign {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: CosignData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Cosign {
            remix_track_id: data.track_id,
            cosigner_user_id: data.parent_track_owner_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let user_ids = [self.cosigner_user_id, self.receiver_user_id];
        let track_ids = [self.remix_track_id];
        let (users, tracks) = futures::try_join!(
            ctx.discovery.users_by_ids(&user_ids),
            ctx.discovery.tracks_by_ids(&track_ids),
        )?;
        let cosigner = match find_user(&users, self.cosigner_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let remix = match tracks.first() {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "{} co-signed your remix {}",
            cosigner.display_name(),
            remix.title
        );
        let email_entry = json!({
            "type": "cosign",
            "users": [{
                "userId": cosigner.user_id,
                "handle": cosigner.handle,
                "name": cosigner.name,
            }],
            "entity": {"type": "track", "id": self.remix_track_id, "name": remix.title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.cosigner_user_id),
            NotificationCategory::Remixes,
            "New Cosign",
            &body,
            json!({"type": "cosign", "entityId": self.remix_track_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.cosigner_user_id],
            track_ids: vec![self.remix_track_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let cosigner = resources.users.get(&self.cosigner_user_id)?;
        let remix = resources.tracks.get(&self.remix_track_id)?;
        Some(json!({
            "type": "cosign",
            "users": [{
                "userId": cosigner.user_id,
                "handle": cosigner.handle,
                "name": cosigner.name,
            }],
            "entity": {"type": "track", "id": self.remix_track_id, "name": remix.title},
            "text": format!("{} co-signed your remix {}", cosigner.display_name(), remix.title),
        }))
    }
}
