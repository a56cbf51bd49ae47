//! Story entity model and DTOs.

use panelcraft_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: DbId,
    /// Globally unique and never changed after creation.
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub style: String,
    pub user_id: UserId,
    pub story_summary: Option<String>,
    pub character_descriptions: Option<String>,
    pub uses_own_api_key: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Story {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// DTO for inserting a story. The slug is chosen by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStory {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub style: String,
    pub user_id: UserId,
    pub story_summary: Option<String>,
    pub character_descriptions: Option<String>,
    pub uses_own_api_key: bool,
}

/// Patch for user-editable story fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStory {
    pub title: Option<String>,
    pub description: Option<String>,
    pub story_summary: Option<String>,
    pub character_descriptions: Option<String>,
}

/// Listing row: a story with its page count and cover image.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoryListItem {
    pub id: DbId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub style: String,
    pub page_count: i64,
    /// Image of the lowest-numbered page that has one.
    pub cover_image_url: Option<String>,
    pub created_at: Timestamp,
    /// Latest of the story's and its pages' update times.
    pub last_updated_at: Timestamp,
}
