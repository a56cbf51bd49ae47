//! OCR text block model.

use panelcraft_core::ocr::BoundingBox;
use panelcraft_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `page_text_blocks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PageTextBlock {
    pub id: DbId,
    pub page_id: DbId,
    pub text: String,
    pub bounding_box: Json<BoundingBox>,
    /// Whole percent, when the recognizer reported one.
    pub confidence: Option<i32>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTextBlock {
    pub text: String,
    pub bounding_box: BoundingBox,
    pub confidence: Option<i32>,
}
