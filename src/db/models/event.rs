use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw row from the discovery store's `notification` table, as delivered by
/// the insert trigger or read back by the email aggregation job. Read-only
/// once decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub specifier: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub user_ids: Vec<i32>,
}

/// Database-side shape of a notification row. `user_ids` is an int[] column;
/// `data` is jsonb.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub timestamp: NaiveDateTime,
    pub specifier: String,
    pub group_id: String,
    pub data: serde_json::Value,
    pub user_ids: Vec<i32>,
}

impl From<NotificationRow> for NotificationEvent {
    fn from(row: NotificationRow) -> Self {
        NotificationEvent {
            id: row.id,
            kind: row.kind,
            timestamp: row.timestamp,
            specifier: row.specifier,
            group_id: row.group_id,
            data: row.data,
            user_ids: row.user_ids,
        }
    }
}
