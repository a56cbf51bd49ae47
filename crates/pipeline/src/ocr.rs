//! Text recognition over generated pages.

use std::sync::Arc;

use panelcraft_core::gateway::{GatewayError, TextRecognizer};
use panelcraft_core::ocr::{confidence_percent, full_text, RecognizedText};
use panelcraft_core::types::DbId;
use panelcraft_db::models::page::Page;
use panelcraft_db::models::story::Story;
use panelcraft_db::models::text_block::{NewTextBlock, PageTextBlock};
use serde::Serialize;

use crate::store::{StoreError, StoryStore};

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("You do not have access to this story")]
    Forbidden,

    #[error("Page {page_id} has no generated image")]
    NoImage { page_id: DbId },

    #[error("Text recognition failed: {0}")]
    Recognizer(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrPageResult {
    pub page_id: DbId,
    pub page_number: i32,
    pub text_blocks: Vec<PageTextBlock>,
    pub full_text: String,
}

pub struct OcrService {
    store: Arc<dyn StoryStore>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl OcrService {
    pub fn new(store: Arc<dyn StoryStore>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { store, recognizer }
    }

    /// Recognize one page and replace its stored text blocks.
    pub async fn process_page(
        &self,
        user_id: &str,
        page_id: DbId,
    ) -> Result<OcrPageResult, OcrError> {
        let page = self
            .store
            .find_page(page_id)
            .await?
            .ok_or(OcrError::NotFound { entity: "Page" })?;
        let story = self
            .store
            .find_story_by_id(page.story_id)
            .await?
            .ok_or(OcrError::NotFound { entity: "Story" })?;
        ensure_owner(&story, user_id)?;

        if page.generated_image_url.is_none() {
            return Err(OcrError::NoImage { page_id });
        }
        self.recognize(&page).await
    }

    /// Recognize every imaged page of a story, in page order.
    pub async fn process_story(
        &self,
        user_id: &str,
        story_id: DbId,
    ) -> Result<Vec<OcrPageResult>, OcrError> {
        let story = self
            .store
            .find_story_by_id(story_id)
            .await?
            .ok_or(OcrError::NotFound { entity: "Story" })?;
        ensure_owner(&story, user_id)?;

        let pages = self.store.list_pages(story.id).await?;
        let mut results = Vec::new();
        for page in pages.iter().filter(|p| p.generated_image_url.is_some()) {
            results.push(self.recognize(page).await?);
        }
        tracing::info!(story_id, pages = results.len(), "Story OCR complete");
        Ok(results)
    }

    async fn recognize(&self, page: &Page) -> Result<OcrPageResult, OcrError> {
        let Some(image_url) = page.generated_image_url.as_deref() else {
            return Err(OcrError::NoImage { page_id: page.id });
        };

        let recognized = self.recognizer.recognize_text(image_url).await?;
        let text = full_text(&recognized);
        let blocks: Vec<NewTextBlock> = recognized.into_iter().map(to_new_block).collect();
        let stored = self.store.replace_text_blocks(page.id, &blocks).await?;

        tracing::debug!(page_id = page.id, blocks = stored.len(), "Page text recognized");
        Ok(OcrPageResult {
            page_id: page.id,
            page_number: page.page_number,
            text_blocks: stored,
            full_text: text,
        })
    }
}

fn ensure_owner(story: &Story, user_id: &str) -> Result<(), OcrError> {
    if story.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(OcrError::Forbidden)
    }
}

fn to_new_block(text: RecognizedText) -> NewTextBlock {
    NewTextBlock {
        text: text.text,
        bounding_box: text.bounding_box,
        confidence: confidence_percent(text.confidence),
    }
}
