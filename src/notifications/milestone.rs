use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

/// Milestone flavors the store-side aggregation emits. The aggregation
/// pre-collapses the contributing events into a single row per group id, so
/// one row is always exactly one notification here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    FollowerCount,
    TrackRepostCount,
    TrackSaveCount,
    PlaylistRepostCount,
    PlaylistSaveCount,
    ListenCount,
}

#[derive(Debug, Clone, Deserialize)]
struct MilestoneData {
    #[serde(rename = "type")]
    kind: MilestoneKind,
    threshold: i64,
    #[serde(default)]
    entity_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub threshold: i64,
    pub entity_id: Option<i32>,
    pub receiver_user_id: i32,
}

impl Milestone {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: MilestoneData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Milestone {
            kind: data.kind,
            threshold: data.threshold,
            entity_id: data.entity_id,
            receiver_user_id,
        })
    }

    fn is_track_milestone(&self) -> bool {
        matches!(
            self.kind,
            MilestoneKind::TrackRepostCount | MilestoneKind::TrackSaveCount | MilestoneKind::ListenCount
        )
    }

    async fn body(&self, ctx: &DispatchContext) -> AppResult<String> {
        let entity_name = match self.entity_id {
            Some(id) if self.is_track_milestone() => ctx
                .discovery
                .tracks_by_ids(&[id])
                .await?
                .into_iter()
                .next()
                .map(|t| t.title),
            Some(id) => ctx
                .discovery
                .playlists_by_ids(&[id])
                .await?
                .into_iter()
                .next()
                .map(|p| p.playlist_name),
            None => None,
        };

        Ok(milestone_text(self.kind, self.threshold, entity_name.as_deref()))
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx.discovery.users_by_ids(&[self.receiver_user_id]).await?;
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = self.body(ctx).await?;
        let email_entry = json!({
            "type": "milestone",
            "milestone": {"kind": milestone_kind_str(self.kind), "threshold": self.threshold},
            "entityId": self.entity_id,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            None,
            NotificationCategory::Milestones,
            "Congratulations!",
            &body,
            json!({"type": "milestone", "threshold": self.threshold}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        let mut ids = ResourceIds::default();
        if let Some(id) = self.entity_id {
            if self.is_track_milestone() {
                ids.track_ids.push(id);
            } else {
                ids.playlist_ids.push(id);
            }
        }
        ids
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let entity_name = self.entity_id.and_then(|id| {
            if self.is_track_milestone() {
                resources.tracks.get(&id).map(|t| t.title.clone())
            } else {
                resources.playlists.get(&id).map(|p| p.playlist_name.clone())
            }
        });
        Some(json!({
            "type": "milestone",
            "milestone": {"kind": milestone_kind_str(self.kind), "threshold": self.threshold},
            "entityId": self.entity_id,
            "text": milestone_text(self.kind, self.threshold, entity_name.as_deref()),
        }))
    }
}

fn milestone_kind_str(kind: MilestoneKind) -> &'static str {
    match kind {
        MilestoneKind::FollowerCount => "follower_count",
        MilestoneKind::TrackRepostCount => "track_repost_count",
        MilestoneKind::TrackSaveCount => "track_save_count",
        MilestoneKind::PlaylistRepostCount => "playlist_repost_count",
        MilestoneKind::PlaylistSaveCount => "playlist_save_count",
        MilestoneKind::ListenCount => "listen_count",
    }
}

/// Threshold milestones without a resolvable entity render an empty body;
/// the push still carries the title.
fn milestone_text(kind: MilestoneKind, threshold: i64, entity: Option<&str>) -> String {
    match (kind, entity) {
        (MilestoneKind::FollowerCount, _) => {
            format!("You have reached over {} followers", threshold)
        }
        (MilestoneKind::TrackRepostCount, Some(name)) => {
            format!("Your track {} has reached over {} reposts", name, threshold)
        }
        (MilestoneKind::TrackSaveCount, Some(name)) => {
            format!("Your track {} has reached over {} favorites", name, threshold)
        }
        (MilestoneKind::PlaylistRepostCount, Some(name)) => {
            format!("Your playlist {} has reached over {} reposts", name, threshold)
        }
        (MilestoneKind::PlaylistSaveCount, Some(name)) => {
            format!("Your playlist {} has reached over {} favorites", name, threshold)
        }
        (MilestoneKind::ListenCount, Some(name)) => {
            format!("Your track {} has reached over {} listens", name, threshold)
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{map_event, TypedNotification};
    use chrono::NaiveDate;

    #[test]
    fn pre_collapsed_row_yields_one_notification() {
        // Ten reposts behind one group id arrive as a single milestone row;
        // the mapper must not re-expand it.
        let event = crate::db::models::NotificationEvent {
            id: "m1".to_string(),
            kind: "milestone".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            specifier: "2".to_string(),
            group_id: "milestone:track_repost_count:10:track:7".to_string(),
            data: serde_json::json!({
                "type": "track_repost_count",
                "threshold": 10,
                "entity_id": 7
            }),
            user_ids: vec![2],
        };

        let mapped: Vec<_> = [&event].iter().filter_map(|e| map_event(e)).collect();
        assert_eq!(mapped.len(), 1);
        match &mapped[0] {
            TypedNotification::Milestone(m) => {
                assert_eq!(m.threshold, 10);
                assert_eq!(m.entity_id, Some(7));
            }
            other => panic!("expected Milestone, got {}", other.kind_str()),
        }
    }

    #[test]
    fn missing_entity_renders_empty_body() {
        assert_eq!(
            milestone_text(MilestoneKind::TrackRepostCount, 10, None),
            ""
        );
    }
}
