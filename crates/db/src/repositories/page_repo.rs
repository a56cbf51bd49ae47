//! Repository for the `pages` table.

use panelcraft_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::page::{CreatePage, Page, RedrawPage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, story_id, page_number, prompt, character_image_urls, model, layout, \
     is_custom_prompt, generated_image_url, created_at, updated_at";

/// Provides CRUD and numbering queries for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a page without an image, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePage) -> Result<Page, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages
                (story_id, page_number, prompt, character_image_urls, model, layout, is_custom_prompt)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(input.story_id)
            .bind(input.page_number)
            .bind(&input.prompt)
            .bind(Json(&input.character_image_urls))
            .bind(&input.model)
            .bind(&input.layout)
            .bind(input.is_custom_prompt)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All pages of a story in page-number order.
    pub async fn list_by_story(pool: &PgPool, story_id: DbId) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages WHERE story_id = $1 ORDER BY page_number ASC"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    /// `max(page_number) + 1`, or 1 for an empty story. Gaps are not filled.
    pub async fn next_page_number(pool: &PgPool, story_id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(page_number), 0) + 1 FROM pages WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(pool)
        .await
    }

    /// Image of the highest-numbered page that has one.
    pub async fn last_page_image(
        pool: &PgPool,
        story_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT generated_image_url FROM pages
             WHERE story_id = $1 AND generated_image_url IS NOT NULL
             ORDER BY page_number DESC
             LIMIT 1",
        )
        .bind(story_id)
        .fetch_optional(pool)
        .await
    }

    /// Record the generated image. Returns `None` if the page is gone.
    pub async fn set_image(
        pool: &PgPool,
        id: DbId,
        image_url: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET generated_image_url = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(image_url)
            .fetch_optional(pool)
            .await
    }

    /// Replace the generation inputs and image of a redrawn page in one write.
    pub async fn record_redraw(
        pool: &PgPool,
        id: DbId,
        input: &RedrawPage,
        image_url: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET
                prompt = $2,
                character_image_urls = $3,
                model = $4,
                layout = $5,
                is_custom_prompt = $6,
                generated_image_url = $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(&input.prompt)
            .bind(Json(&input.character_image_urls))
            .bind(&input.model)
            .bind(&input.layout)
            .bind(input.is_custom_prompt)
            .bind(image_url)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a page. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
