//! Repository for the append-only `page_generations` table.

use panelcraft_core::types::{DbId, Timestamp};
use sqlx::PgPool;

pub struct GenerationRepo;

impl GenerationRepo {
    /// Log one successful image generation for `user_id`.
    pub async fn record(
        pool: &PgPool,
        user_id: &str,
        page_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO page_generations (user_id, page_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(page_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Generations logged for `user_id` since `since`, and the oldest one.
    pub async fn count_since(
        pool: &PgPool,
        user_id: &str,
        since: Timestamp,
    ) -> Result<(i64, Option<Timestamp>), sqlx::Error> {
        sqlx::query_as::<_, (i64, Option<Timestamp>)>(
            "SELECT COUNT(*), MIN(created_at)
             FROM page_generations
             WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }
}
