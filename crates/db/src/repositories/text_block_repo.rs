//! Repository for the `page_text_blocks` table.

use panelcraft_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::text_block::{NewTextBlock, PageTextBlock};

const COLUMNS: &str = "id, page_id, text, bounding_box, confidence, created_at";

pub struct TextBlockRepo;

impl TextBlockRepo {
    /// Replace every text block of a page within a single transaction.
    pub async fn replace_for_page(
        pool: &PgPool,
        page_id: DbId,
        blocks: &[NewTextBlock],
    ) -> Result<Vec<PageTextBlock>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM page_text_blocks WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO page_text_blocks (page_id, text, bounding_box, confidence)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(blocks.len());
        for block in blocks {
            let row = sqlx::query_as::<_, PageTextBlock>(&query)
                .bind(page_id)
                .bind(&block.text)
                .bind(Json(&block.bounding_box))
                .bind(block.confidence)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(rows)
    }

    /// Text blocks of a page in insertion order.
    pub async fn list_by_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<PageTextBlock>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM page_text_blocks WHERE page_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, PageTextBlock>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }
}
