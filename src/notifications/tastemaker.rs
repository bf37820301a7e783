use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct TastemakerData {
    tastemaker_item_id: i32,
    tastemaker_item_owner_id: i32,
}

/// The receiver's early repost/favorite helped a track start trending.
#[derive(Debug, Clone)]
pub struct Tastemaker {
    pub track_id: i32,
    pub track_owner_id: i32,
    pub receiver_user_id: i32,
}

impl Tastemaker {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: TastemakerData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Tastemaker {
            track_id: data.tastemaker_item_id,
            track_owner_id: data.tastemaker_item_owner_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let user_ids = [self.receiver_user_id];
        let track_ids = [self.track_id];
        let (users, tracks) = futures::try_join!(
            ctx.discovery.users_by_ids(&user_ids),
            ctx.discovery.tracks_by_ids(&track_ids),
        )?;
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let track = match tracks.first() {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!("{} is now trending thanks to you! Great work", track.title);
        let email_entry = json!({
            "type": "tastemaker",
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            None,
            NotificationCategory::Milestones,
            "You're a Tastemaker!",
            &body,
            json!({"type": "tastemaker", "entityId": self.track_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.track_owner_id],
            track_ids: vec![self.track_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let track = resources.tracks.get(&self.track_id)?;
        Some(json!({
            "type": "tastemaker",
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "text": format!("{} is now trending thanks to you! Great work", track.title),
        }))
    }
}
