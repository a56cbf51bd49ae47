//! Persistence port used by the orchestrator, and its PostgreSQL adapter.

use async_trait::async_trait;
use panelcraft_core::types::{DbId, Timestamp};
use panelcraft_db::models::page::{CreatePage, Page, RedrawPage};
use panelcraft_db::models::story::{CreateStory, Story, UpdateStory};
use panelcraft_db::models::text_block::{NewTextBlock, PageTextBlock};
use panelcraft_db::repositories::{GenerationRepo, PageRepo, StoryRepo, TextBlockRepo};
use sqlx::PgPool;

/// PostgreSQL unique violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure from a non-SQL backend.
    #[error("{0}")]
    Backend(String),
}

/// Story, page and text block persistence needed by generation and OCR.
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::SlugTaken`] when the slug is already used.
    async fn create_story(&self, input: &CreateStory) -> Result<Story, StoreError>;

    async fn find_story_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError>;

    async fn find_story_by_slug(&self, slug: &str) -> Result<Option<Story>, StoreError>;

    async fn update_story(&self, id: DbId, input: &UpdateStory) -> Result<(), StoreError>;

    async fn touch_story(&self, id: DbId) -> Result<(), StoreError>;

    /// Delete a story and, by cascade, its pages and text blocks.
    async fn delete_story(&self, id: DbId) -> Result<(), StoreError>;

    /// Pages of a story in page-number order.
    async fn list_pages(&self, story_id: DbId) -> Result<Vec<Page>, StoreError>;

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, StoreError>;

    async fn next_page_number(&self, story_id: DbId) -> Result<i32, StoreError>;

    async fn last_page_image(&self, story_id: DbId) -> Result<Option<String>, StoreError>;

    async fn create_page(&self, input: &CreatePage) -> Result<Page, StoreError>;

    /// Returns `None` if the page no longer exists.
    async fn set_page_image(&self, id: DbId, image_url: &str) -> Result<Option<Page>, StoreError>;

    /// Returns `None` if the page no longer exists.
    async fn record_redraw(
        &self,
        id: DbId,
        input: &RedrawPage,
        image_url: &str,
    ) -> Result<Option<Page>, StoreError>;

    async fn delete_page(&self, id: DbId) -> Result<(), StoreError>;

    /// Append one successful image generation to the user's log.
    async fn record_generation(&self, user_id: &str, page_id: DbId) -> Result<(), StoreError>;

    /// Generations logged for `user_id` since `since`, and the oldest one.
    /// Redraws count and deleting pages never lowers the total.
    async fn generated_since(
        &self,
        user_id: &str,
        since: Timestamp,
    ) -> Result<(i64, Option<Timestamp>), StoreError>;

    /// Atomically replace all text blocks of a page.
    async fn replace_text_blocks(
        &self,
        page_id: DbId,
        blocks: &[NewTextBlock],
    ) -> Result<Vec<PageTextBlock>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL adapter
// ---------------------------------------------------------------------------

/// [`StoryStore`] over the repositories in `panelcraft-db`.
#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(StoryRepo::slug_exists(&self.pool, slug).await?)
    }

    async fn create_story(&self, input: &CreateStory) -> Result<Story, StoreError> {
        StoryRepo::create(&self.pool, input).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::SlugTaken(input.slug.clone())
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_story_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError> {
        Ok(StoryRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_story_by_slug(&self, slug: &str) -> Result<Option<Story>, StoreError> {
        Ok(StoryRepo::find_by_slug(&self.pool, slug).await?)
    }

    async fn update_story(&self, id: DbId, input: &UpdateStory) -> Result<(), StoreError> {
        StoryRepo::update(&self.pool, id, input).await?;
        Ok(())
    }

    async fn touch_story(&self, id: DbId) -> Result<(), StoreError> {
        Ok(StoryRepo::touch(&self.pool, id).await?)
    }

    async fn delete_story(&self, id: DbId) -> Result<(), StoreError> {
        StoryRepo::delete(&self.pool, id).await?;
        Ok(())
    }

    async fn list_pages(&self, story_id: DbId) -> Result<Vec<Page>, StoreError> {
        Ok(PageRepo::list_by_story(&self.pool, story_id).await?)
    }

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, StoreError> {
        Ok(PageRepo::find_by_id(&self.pool, id).await?)
    }

    async fn next_page_number(&self, story_id: DbId) -> Result<i32, StoreError> {
        Ok(PageRepo::next_page_number(&self.pool, story_id).await?)
    }

    async fn last_page_image(&self, story_id: DbId) -> Result<Option<String>, StoreError> {
        Ok(PageRepo::last_page_image(&self.pool, story_id).await?)
    }

    async fn create_page(&self, input: &CreatePage) -> Result<Page, StoreError> {
        Ok(PageRepo::create(&self.pool, input).await?)
    }

    async fn set_page_image(&self, id: DbId, image_url: &str) -> Result<Option<Page>, StoreError> {
        Ok(PageRepo::set_image(&self.pool, id, image_url).await?)
    }

    async fn record_redraw(
        &self,
        id: DbId,
        input: &RedrawPage,
        image_url: &str,
    ) -> Result<Option<Page>, StoreError> {
        Ok(PageRepo::record_redraw(&self.pool, id, input, image_url).await?)
    }

    async fn delete_page(&self, id: DbId) -> Result<(), StoreError> {
        PageRepo::delete(&self.pool, id).await?;
        Ok(())
    }

    async fn record_generation(&self, user_id: &str, page_id: DbId) -> Result<(), StoreError> {
        Ok(GenerationRepo::record(&self.pool, user_id, Some(page_id)).await?)
    }

    async fn generated_since(
        &self,
        user_id: &str,
        since: Timestamp,
    ) -> Result<(i64, Option<Timestamp>), StoreError> {
        Ok(GenerationRepo::count_since(&self.pool, user_id, since).await?)
    }

    async fn replace_text_blocks(
        &self,
        page_id: DbId,
        blocks: &[NewTextBlock],
    ) -> Result<Vec<PageTextBlock>, StoreError> {
        Ok(TextBlockRepo::replace_for_page(&self.pool, page_id, blocks).await?)
    }
}
