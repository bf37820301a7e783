use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, DispatchContext, EmailResources, ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct RankUpData {
    rank: i32,
    sender_user_id: i32,
    receiver_user_id: i32,
}

/// A fan climbed into the receiver's top-supporter ranking.
#[derive(Debug, Clone)]
pub struct SupporterRankUp {
    pub rank: i32,
    pub supporter_user_id: i32,
    pub receiver_user_id: i32,
}

impl SupporterRankUp {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: RankUpData = parse_data(event)?;
        let receiver_user_id = event
            .user_ids
            .first()
            .copied()
            .unwrap_or(data.receiver_user_id);
        Some(SupporterRankUp {
            rank: data.rank,
            supporter_user_id: data.sender_user_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.supporter_user_id, self.receiver_user_id])
            .await?;
        let supporter = match find_user(&users, self.supporter_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let title = format!("#{} Top Supporter", self.rank);
        let body = format!(
            "{} became your #{} Top Supporter!",
            supporter.display_name(),
            self.rank
        );
        let email_entry = json!({
            "type": "supporter_rank_up",
            "users": [{
                "userId": supporter.user_id,
                "handle": supporter.handle,
                "name": supporter.name,
            }],
            "rank": self.rank,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.supporter_user_id),
            NotificationCategory::Tips,
            &title,
            &body,
            json!({"type": "supporter_rank_up", "rank": self.rank}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.supporter_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let supporter = resources.users.get(&self.supporter_user_id)?;
        Some(json!({
            "type": "supporter_rank_up",
            "users": [{
                "userId": supporter.user_id,
                "handle": supporter.handle,
                "name": supporter.name,
            }],
            "rank": self.rank,
            "text": format!(
                "{} became your #{} Top Supporter!",
                supporter.display_name(),
                self.rank
            ),
        }))
    }
}

/// The receiver climbed in an artist's top-supporter ranking. The push body
/// has no templated copy; only the title renders.
#[derive(Debug, Clone)]
pub struct SupportingRankUp {
    pub rank: i32,
    pub supported_user_id: i32,
    pub receiver_user_id: i32,
}

impl SupportingRankUp {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: RankUpData = parse_data(event)?;
        let receiver_user_id = event
            .user_ids
            .first()
            .copied()
            .unwrap_or(data.sender_user_id);
        Some(SupportingRankUp {
            rank: data.rank,
            supported_user_id: data.receiver_user_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.supported_user_id, self.receiver_user_id])
            .await?;
        let supported = match find_user(&users, self.supported_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let title = format!("#{} Top Supporter", self.rank);
        let email_entry = json!({
            "type": "supporting_rank_up",
            "users": [{
                "userId": supported.user_id,
                "handle": supported.handle,
                "name": supported.name,
            }],
            "rank": self.rank,
            "text": format!(
                "You're now {}'s #{} Top Supporter!",
                supported.display_name(),
                self.rank
            ),
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.supported_user_id),
            NotificationCategory::Tips,
            &title,
            "",
            json!({"type": "supporting_rank_up", "rank": self.rank}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.supported_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let supported = resources.users.get(&self.supported_user_id)?;
        Some(json!({
            "type": "supporting_rank_up",
            "users": [{
                "userId": supported.user_id,
                "handle": supported.handle,
                "name": supported.name,
            }],
            "rank": self.rank,
            "text": format!(
                "You're now {}'s #{} Top Supporter!",
                supported.display_name(),
                self.rank
            ),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DethronedData {
    sender_user_id: i32,
    dethroned_user_id: i32,
}

/// Another supporter overtook the receiver's #1 spot.
#[derive(Debug, Clone)]
pub struct SupporterDethroned {
    pub usurper_user_id: i32,
    pub receiver_user_id: i32,
}

impl SupporterDethroned {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: DethronedData = parse_data(event)?;
        let receiver_user_id = event
            .user_ids
            .first()
            .copied()
            .unwrap_or(data.dethroned_user_id);
        Some(SupporterDethroned {
            usurper_user_id: data.sender_user_id,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.usurper_user_id, self.receiver_user_id])
            .await?;
        let usurper = match find_user(&users, self.usurper_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = format!(
            "{} dethroned you as #1 Top Supporter! Tip to reclaim your spot?",
            usurper.display_name()
        );
        let email_entry = json!({
            "type": "supporter_dethroned",
            "users": [{
                "userId": usurper.user_id,
                "handle": usurper.handle,
                "name": usurper.name,
            }],
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.usurper_user_id),
            NotificationCategory::Tips,
            "Watch Out!",
            &body,
            json!({"type": "supporter_dethroned"}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.usurper_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let usurper = resources.users.get(&self.usurper_user_id)?;
        Some(json!({
            "type": "supporter_dethroned",
            "users": [{
                "userId": usurper.user_id,
                "handle": usurper.handle,
                "name": usurper.name,
            }],
            "text": format!(
                "{} dethroned you as #1 Top Supporter! Tip to reclaim your spot?",
                usurper.display_name()
            ),
        }))
    }
}
