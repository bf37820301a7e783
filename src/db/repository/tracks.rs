use sqlx::PgPool;

use crate::db::models::Track;
use crate::error::{AppError, AppResult};

// ============================================================================
// Track Repository (discovery store)
// ============================================================================

pub struct TrackRepository;

impl TrackRepository {
    pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> AppResult<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Track>(
            r#"
            SELECT track_id, title, owner_id
            FROM tracks
            WHERE track_id = ANY($1) AND is_current = TRUE
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
