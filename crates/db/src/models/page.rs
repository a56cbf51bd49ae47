//! Page entity model and DTOs.

use panelcraft_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub story_id: DbId,
    /// 1-based, unique within the story, never reused.
    pub page_number: i32,
    pub prompt: String,
    /// Ordered character reference images chosen for this page.
    pub character_image_urls: Json<Vec<String>>,
    pub model: Option<String>,
    pub layout: Option<String>,
    pub is_custom_prompt: bool,
    /// `None` until generation succeeds.
    pub generated_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a page before its image exists.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePage {
    pub story_id: DbId,
    pub page_number: i32,
    pub prompt: String,
    pub character_image_urls: Vec<String>,
    pub model: Option<String>,
    pub layout: Option<String>,
    pub is_custom_prompt: bool,
}

/// New generation inputs recorded when a page is redrawn.
#[derive(Debug, Clone, Deserialize)]
pub struct RedrawPage {
    pub prompt: String,
    pub character_image_urls: Vec<String>,
    pub model: Option<String>,
    pub layout: Option<String>,
    pub is_custom_prompt: bool,
}
