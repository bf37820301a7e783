use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: i32,
    pub playlist_name: String,
    pub playlist_owner_id: i32,
    pub is_album: bool,
}
