use sqlx::PgPool;

use crate::db::models::Playlist;
use crate::error::{AppError, AppResult};

// ============================================================================
// Playlist Repository (discovery store)
// ============================================================================

pub struct PlaylistRepository;

impl PlaylistRepository {
    pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> AppResult<Vec<Playlist>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Playlist>(
            r#"
            SELECT playlist_id, playlist_name, playlist_owner_id, is_album
            FROM playlists
            WHERE playlist_id = ANY($1) AND is_current = TRUE
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
