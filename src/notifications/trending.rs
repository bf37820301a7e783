use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct TrendingData {
    track_id: i32,
    rank: i32,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    time_range: Option<String>,
}

/// The receiver's track entered a trending chart.
#[derive(Debug, Clone)]
pub struct TrendingTrack {
    pub track_id: i32,
    pub rank: i32,
    pub genre: Option<String>,
    pub time_range: Option<String>,
    pub receiver_user_id: i32,
}

impl TrendingTrack {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: TrendingData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(TrendingTrack {
            track_id: data.track_id,
            rank: data.rank,
            genre: data.genre,
            time_range: data.time_range,
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

        let body = format!(
            "Your track {} is #{} on Trending right now!",
            track.title, self.rank
        );
        let email_entry = json!({
            "type": "trending",
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "rank": self.rank,
            "genre": self.genre,
            "timeRange": self.time_range,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            None,
            NotificationCategory::Milestones,
            "You're Trending!",
            &body,
            json!({"type": "trending", "entityId": self.track_id, "rank": self.rank}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            track_ids: vec![self.track_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let track = resources.tracks.get(&self.track_id)?;
        Some(json!({
            "type": "trending",
            "entity": {"type": "track", "id": self.track_id, "name": track.title},
            "rank": self.rank,
            "genre": self.genre,
            "timeRange": self.time_range,
            "text": format!(
                "Your track {} is #{} on Trending right now!",
                track.title, self.rank
            ),
        }))
    }
}
