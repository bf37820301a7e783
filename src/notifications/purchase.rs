use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::format::format_usdc;
use super::{
    deliver_to_receiver, entity_title, find_user, parse_data, DispatchContext, EmailResources,
    EntityType, ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct PurchaseData {
    #[serde(rename = "content_type")]
    entity_type: EntityType,
    content_id: i32,
    buyer_user_id: i32,
    seller_user_id: i32,
    amount: String,
    #[serde(default)]
    extra_amount: Option<String>,
}

fn total_amount(amount: &str, extra: Option<&str>) -> String {
    let base: u128 = amount.trim().parse().unwrap_or(0);
    let extra: u128 = extra.and_then(|e| e.trim().parse().ok()).unwrap_or(0);
    (base + extra).to_string()
}

/// Receipt for the buyer of paid content.
#[derive(Debug, Clone)]
pub struct UsdcPurchaseBuyer {
    pub entity_type: EntityType,
    pub content_id: i32,
    pub buyer_user_id: i32,
    pub seller_user_id: i32,
    pub amount: String,
}

impl UsdcPurchaseBuyer {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: PurchaseData = parse_data(event)?;
        let buyer = event.user_ids.first().copied().unwrap_or(data.buyer_user_id);
        Some(UsdcPurchaseBuyer {
            entity_type: data.entity_type,
            content_id: data.content_id,
            buyer_user_id: buyer,
            seller_user_id: data.seller_user_id,
            amount: total_amount(&data.amount, data.extra_amount.as_deref()),
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.buyer_user_id, self.seller_user_id])
            .await?;
        let buyer = match find_user(&users, self.buyer_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let seller = match find_user(&users, self.seller_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let title = match entity_title(ctx, self.entity_type, self.content_id).await? {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!("You just purchased {} from {}!", title, seller.display_name());
        let email_entry = json!({
            "type": "usdc_purchase_buyer",
            "users": [{
                "userId": seller.user_id,
                "handle": seller.handle,
                "name": seller.name,
            }],
            "entity": {"type": self.entity_type, "id": self.content_id, "name": title},
            "amount": format_usdc(&self.amount),
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            buyer,
            Some(self.seller_user_id),
            NotificationCategory::Tips,
            "Purchase Successful",
            &body,
            json!({"type": "usdc_purchase_buyer", "entityId": self.content_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        purchase_resource_ids(self.seller_user_id, self.entity_type, self.content_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let seller = resources.users.get(&self.seller_user_id)?;
        let name = super::repost::entity_name(self.entity_type, self.content_id, resources)?;
        Some(json!({
            "type": "usdc_purchase_buyer",
            "users": [{
                "userId": seller.user_id,
                "handle": seller.handle,
                "name": seller.name,
            }],
            "entity": {"type": self.entity_type, "id": self.content_id, "name": name},
            "amount": format_usdc(&self.amount),
            "text": format!("You just purchased {} from {}!", name, seller.display_name()),
        }))
    }
}

/// Sale confirmation for the seller of paid content.
#[derive(Debug, Clone)]
pub struct UsdcPurchaseSeller {
    pub entity_type: EntityType,
    pub content_id: i32,
    pub buyer_user_id: i32,
    pub seller_user_id: i32,
    pub amount: String,
}

impl UsdcPurchaseSeller {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: PurchaseData = parse_data(event)?;
        let seller = event
            .user_ids
            .first()
            .copied()
            .unwrap_or(data.seller_user_id);
        Some(UsdcPurchaseSeller {
            entity_type: data.entity_type,
            content_id: data.content_id,
            buyer_user_id: data.buyer_user_id,
            seller_user_id: seller,
            amount: total_amount(&data.amount, data.extra_amount.as_deref()),
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.buyer_user_id, self.seller_user_id])
            .await?;
        let buyer = match find_user(&users, self.buyer_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let seller = match find_user(&users, self.seller_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let title = match entity_title(ctx, self.entity_type, self.content_id).await? {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "Congrats, {} just bought your {} {} for ${}!",
            buyer.display_name(),
            self.entity_type.noun(),
            title,
            format_usdc(&self.amount)
        );
        let email_entry = json!({
            "type": "usdc_purchase_seller",
            "users": [{
                "userId": buyer.user_id,
                "handle": buyer.handle,
                "name": buyer.name,
            }],
            "entity": {"type": self.entity_type, "id": self.content_id, "name": title},
            "amount": format_usdc(&self.amount),
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            seller,
            Some(self.buyer_user_id),
            NotificationCategory::Tips,
            "Track Sold",
            &body,
            json!({"type": "usdc_purchase_seller", "entityId": self.content_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        purchase_resource_ids(self.buyer_user_id, self.entity_type, self.content_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let buyer = resources.users.get(&self.buyer_user_id)?;
        let name = super::repost::entity_name(self.entity_type, self.content_id, resources)?;
        Some(json!({
            "type": "usdc_purchase_seller",
            "users": [{
                "userId": buyer.user_id,
                "handle": buyer.handle,
                "name": buyer.name,
            }],
            "entity": {"type": self.entity_type, "id": self.content_id, "name": name},
            "amount": format_usdc(&self.amount),
            "text": format!(
                "Congrats, {} just bought your {} {} for ${}!",
                buyer.display_name(),
                self.entity_type.noun(),
                name,
                format_usdc(&self.amount)
            ),
        }))
    }
}

fn purchase_resource_ids(counterparty: i32, entity: EntityType, content_id: i32) -> ResourceIds {
    let mut ids = ResourceIds {
        user_ids: vec![counterparty],
        ..Default::default()
    };
    match entity {
        EntityType::Track => ids.track_ids.push(content_id),
        EntityType::Playlist | EntityType::Album => ids.playlist_ids.push(content_id),
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_amount_folds_into_total() {
        assert_eq!(total_amount("1000000", Some("500000")), "1500000");
        assert_eq!(total_amount("1000000", None), "1000000");
    }
}
