use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Track {
    pub track_id: i32,
    pub title: String,
    pub owner_id: i32,
}
