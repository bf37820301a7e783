use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::format::format_audio;
use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct ChallengeRewardData {
    amount: String,
    challenge_id: String,
}

#[derive(Debug, Clone)]
pub struct ChallengeReward {
    pub amount: String,
    pub challenge_id: String,
    pub receiver_user_id: i32,
}

impl ChallengeReward {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: ChallengeRewardData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(ChallengeReward {
            amount: data.amount,
            challenge_id: data.challenge_id,
            receiver_user_id,
        })
    }

    fn body(&self) -> String {
        format!(
            "You've earned {} $AUDIO for completing this challenge!",
            format_audio(&self.amount)
        )
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx.discovery.users_by_ids(&[self.receiver_user_id]).await?;
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = self.body();
        let email_entry = json!({
            "type": "challenge_reward",
            "challengeId": self.challenge_id,
            "amount": format_audio(&self.amount),
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            None,
            NotificationCategory::Milestones,
            "You've Earned a Reward!",
            &body,
            json!({"type": "challenge_reward", "challengeId": self.challenge_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds::default()
    }

    pub fn format_for_email(&self, _resources: &EmailResources) -> Option<serde_json::Value> {
        Some(json!({
            "type": "challenge_reward",
            "challengeId": self.challenge_id,
            "amount": format_audio(&self.amount),
            "text": self.body(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_body_formats_amount() {
        let reward = ChallengeReward {
            amount: "100000000".to_string(),
            challenge_id: "profile-completion".to_string(),
            receiver_user_id: 2,
        };
        assert_eq!(
            reward.body(),
            "You've earned 1 $AUDIO for completing this challenge!"
        );
    }
}
