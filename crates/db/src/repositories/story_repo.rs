//! Repository for the `stories` table.

use panelcraft_core::types::DbId;
use sqlx::PgPool;

use crate::models::story::{CreateStory, Story, StoryListItem, UpdateStory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, slug, title, description, style, user_id, story_summary, \
     character_descriptions, uses_own_api_key, created_at, updated_at";

/// Provides CRUD operations for stories.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a new story, returning the created row.
    ///
    /// Fails with a unique violation on `uq_stories_slug` if the slug is taken.
    pub async fn create(pool: &PgPool, input: &CreateStory) -> Result<Story, sqlx::Error> {
        let query = format!(
            "INSERT INTO stories
                (slug, title, description, style, user_id, story_summary,
                 character_descriptions, uses_own_api_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(&input.slug)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.style)
            .bind(&input.user_id)
            .bind(&input.story_summary)
            .bind(&input.character_descriptions)
            .bind(input.uses_own_api_key)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE slug = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Whether any story already uses `slug`.
    pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM stories WHERE slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await
    }

    /// Stories owned by `user_id`, most recently updated first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<StoryListItem>, sqlx::Error> {
        sqlx::query_as::<_, StoryListItem>(
            "SELECT s.id, s.slug, s.title, s.description, s.style,
                    COUNT(p.id) AS page_count,
                    (SELECT c.generated_image_url FROM pages c
                      WHERE c.story_id = s.id AND c.generated_image_url IS NOT NULL
                      ORDER BY c.page_number ASC LIMIT 1) AS cover_image_url,
                    s.created_at,
                    GREATEST(s.updated_at, COALESCE(MAX(p.updated_at), s.updated_at))
                        AS last_updated_at
             FROM stories s
             LEFT JOIN pages p ON p.story_id = s.id
             WHERE s.user_id = $1
             GROUP BY s.id
             ORDER BY last_updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Update a story. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStory,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                story_summary = COALESCE($4, story_summary),
                character_descriptions = COALESCE($5, character_descriptions),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.story_summary)
            .bind(&input.character_descriptions)
            .fetch_optional(pool)
            .await
    }

    /// Bump `updated_at` after a page change.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stories SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Permanently delete a story; pages and text blocks cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
