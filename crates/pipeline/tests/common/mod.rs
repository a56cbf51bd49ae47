//! In-memory fakes for every port the pipeline depends on.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use panelcraft_core::gateway::{
    GatewayError, GeneratedImage, ImageGenerationRequest, ImageGenerator, ImageStore,
    TextCompletionRequest, TextGenerator, TextRecognizer,
};
use panelcraft_core::ocr::RecognizedText;
use panelcraft_core::types::{DbId, Timestamp};
use panelcraft_db::models::page::{CreatePage, Page, RedrawPage};
use panelcraft_db::models::story::{CreateStory, Story, UpdateStory};
use panelcraft_db::models::text_block::{NewTextBlock, PageTextBlock};
use panelcraft_pipeline::{GenerationSettings, PageGenerator, StoreError, StoryStore};
use sqlx::types::Json;

pub const OWNER: &str = "user_owner";
pub const STRANGER: &str = "user_stranger";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Operations the fake store can be told to fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreFailures {
    pub create_page: bool,
    pub set_image: bool,
    pub record_redraw: bool,
    pub delete: bool,
}

#[derive(Default)]
struct State {
    next_id: DbId,
    stories: Vec<Story>,
    pages: Vec<Page>,
    text_blocks: Vec<PageTextBlock>,
    failures: StoreFailures,
    /// Append-only generation log: `(user_id, page_id, at)`.
    generations: Vec<(String, Option<DbId>, Timestamp)>,
}

impl State {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn backend(message: &str) -> StoreError {
    StoreError::Backend(message.to_string())
}

impl MemoryStore {
    pub fn fail(&self, failures: StoreFailures) {
        self.state.lock().unwrap().failures = failures;
    }

    /// Log `count` past generations for `user_id` at `at`.
    pub fn seed_generations(&self, user_id: &str, count: usize, at: Timestamp) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state.generations.push((user_id.to_string(), None, at));
        }
    }

    pub fn generation_count(&self, user_id: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.generations.iter().filter(|g| g.0 == user_id).count()
    }

    pub fn seed_story(&self, slug: &str, user_id: &str) -> Story {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let story = Story {
            id: state.id(),
            slug: slug.to_string(),
            title: "Seeded".to_string(),
            description: None,
            style: "manga".to_string(),
            user_id: user_id.to_string(),
            story_summary: Some("Two rivals share a secret.".to_string()),
            character_descriptions: None,
            uses_own_api_key: false,
            created_at: now,
            updated_at: now,
        };
        state.stories.push(story.clone());
        story
    }

    pub fn seed_page(
        &self,
        story_id: DbId,
        page_number: i32,
        image: Option<&str>,
        characters: &[&str],
    ) -> Page {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let page = Page {
            id: state.id(),
            story_id,
            page_number,
            prompt: format!("Prompt of page {page_number}"),
            character_image_urls: Json(characters.iter().map(|c| c.to_string()).collect()),
            model: None,
            layout: None,
            is_custom_prompt: false,
            generated_image_url: image.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.pages.push(page.clone());
        page
    }

    pub fn stories(&self) -> Vec<Story> {
        self.state.lock().unwrap().stories.clone()
    }

    pub fn pages(&self, story_id: DbId) -> Vec<Page> {
        let mut pages: Vec<Page> = self
            .state
            .lock()
            .unwrap()
            .pages
            .iter()
            .filter(|p| p.story_id == story_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.page_number);
        pages
    }

    pub fn page(&self, id: DbId) -> Option<Page> {
        self.state
            .lock()
            .unwrap()
            .pages
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn text_blocks(&self, page_id: DbId) -> Vec<PageTextBlock> {
        self.state
            .lock()
            .unwrap()
            .text_blocks
            .iter()
            .filter(|b| b.page_id == page_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().stories.iter().any(|s| s.slug == slug))
    }

    async fn create_story(&self, input: &CreateStory) -> Result<Story, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.stories.iter().any(|s| s.slug == input.slug) {
            return Err(StoreError::SlugTaken(input.slug.clone()));
        }
        let now = Utc::now();
        let story = Story {
            id: state.id(),
            slug: input.slug.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            style: input.style.clone(),
            user_id: input.user_id.clone(),
            story_summary: input.story_summary.clone(),
            character_descriptions: input.character_descriptions.clone(),
            uses_own_api_key: input.uses_own_api_key,
            created_at: now,
            updated_at: now,
        };
        state.stories.push(story.clone());
        Ok(story)
    }

    async fn find_story_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stories
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_story_by_slug(&self, slug: &str) -> Result<Option<Story>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stories
            .iter()
            .find(|s| s.slug == slug)
            .cloned())
    }

    async fn update_story(&self, id: DbId, input: &UpdateStory) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(story) = state.stories.iter_mut().find(|s| s.id == id) {
            if let Some(title) = &input.title {
                story.title = title.clone();
            }
            if let Some(description) = &input.description {
                story.description = Some(description.clone());
            }
            if let Some(summary) = &input.story_summary {
                story.story_summary = Some(summary.clone());
            }
            if let Some(descriptions) = &input.character_descriptions {
                story.character_descriptions = Some(descriptions.clone());
            }
            story.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn touch_story(&self, id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(story) = state.stories.iter_mut().find(|s| s.id == id) {
            story.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_story(&self, id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.delete {
            return Err(backend("delete failed"));
        }
        state.stories.retain(|s| s.id != id);
        let removed: Vec<DbId> = state
            .pages
            .iter()
            .filter(|p| p.story_id == id)
            .map(|p| p.id)
            .collect();
        state.pages.retain(|p| p.story_id != id);
        state.text_blocks.retain(|b| !removed.contains(&b.page_id));
        for generation in &mut state.generations {
            if generation.1.is_some_and(|page_id| removed.contains(&page_id)) {
                generation.1 = None;
            }
        }
        Ok(())
    }

    async fn list_pages(&self, story_id: DbId) -> Result<Vec<Page>, StoreError> {
        Ok(self.pages(story_id))
    }

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, StoreError> {
        Ok(self.page(id))
    }

    async fn next_page_number(&self, story_id: DbId) -> Result<i32, StoreError> {
        Ok(self
            .pages(story_id)
            .iter()
            .map(|p| p.page_number)
            .max()
            .unwrap_or(0)
            + 1)
    }

    async fn last_page_image(&self, story_id: DbId) -> Result<Option<String>, StoreError> {
        Ok(self
            .pages(story_id)
            .into_iter()
            .rev()
            .find_map(|p| p.generated_image_url))
    }

    async fn create_page(&self, input: &CreatePage) -> Result<Page, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.create_page {
            return Err(backend("insert failed"));
        }
        let now = Utc::now();
        let page = Page {
            id: state.id(),
            story_id: input.story_id,
            page_number: input.page_number,
            prompt: input.prompt.clone(),
            character_image_urls: Json(input.character_image_urls.clone()),
            model: input.model.clone(),
            layout: input.layout.clone(),
            is_custom_prompt: input.is_custom_prompt,
            generated_image_url: None,
            created_at: now,
            updated_at: now,
        };
        state.pages.push(page.clone());
        Ok(page)
    }

    async fn set_page_image(&self, id: DbId, image_url: &str) -> Result<Option<Page>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.set_image {
            return Err(backend("update failed"));
        }
        Ok(state.pages.iter_mut().find(|p| p.id == id).map(|page| {
            page.generated_image_url = Some(image_url.to_string());
            page.updated_at = Utc::now();
            page.clone()
        }))
    }

    async fn record_redraw(
        &self,
        id: DbId,
        input: &RedrawPage,
        image_url: &str,
    ) -> Result<Option<Page>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.record_redraw {
            return Err(backend("update failed"));
        }
        Ok(state.pages.iter_mut().find(|p| p.id == id).map(|page| {
            page.prompt = input.prompt.clone();
            page.character_image_urls = Json(input.character_image_urls.clone());
            page.model = input.model.clone();
            page.layout = input.layout.clone();
            page.is_custom_prompt = input.is_custom_prompt;
            page.generated_image_url = Some(image_url.to_string());
            page.updated_at = Utc::now();
            page.clone()
        }))
    }

    async fn delete_page(&self, id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.delete {
            return Err(backend("delete failed"));
        }
        state.pages.retain(|p| p.id != id);
        state.text_blocks.retain(|b| b.page_id != id);
        for generation in &mut state.generations {
            if generation.1 == Some(id) {
                generation.1 = None;
            }
        }
        Ok(())
    }

    async fn record_generation(&self, user_id: &str, page_id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .generations
            .push((user_id.to_string(), Some(page_id), Utc::now()));
        Ok(())
    }

    async fn generated_since(
        &self,
        user_id: &str,
        since: Timestamp,
    ) -> Result<(i64, Option<Timestamp>), StoreError> {
        let state = self.state.lock().unwrap();
        let times: Vec<Timestamp> = state
            .generations
            .iter()
            .filter(|(user, _, at)| user == user_id && *at >= since)
            .map(|(_, _, at)| *at)
            .collect();
        Ok((times.len() as i64, times.iter().min().copied()))
    }

    async fn replace_text_blocks(
        &self,
        page_id: DbId,
        blocks: &[NewTextBlock],
    ) -> Result<Vec<PageTextBlock>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.text_blocks.retain(|b| b.page_id != page_id);
        let mut stored = Vec::with_capacity(blocks.len());
        for block in blocks {
            let row = PageTextBlock {
                id: state.id(),
                page_id,
                text: block.text.clone(),
                bounding_box: Json(block.bounding_box.clone()),
                confidence: block.confidence,
                created_at: Utc::now(),
            };
            state.text_blocks.push(row.clone());
            stored.push(row);
        }
        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// Gateways
// ---------------------------------------------------------------------------

/// Image generator returning queued results, then successes.
#[derive(Default)]
pub struct FakeImages {
    queued: Mutex<VecDeque<Result<GeneratedImage, GatewayError>>>,
    requests: Mutex<Vec<ImageGenerationRequest>>,
}

impl FakeImages {
    pub fn fail_next(&self, error: GatewayError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ImageGenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ImageGenerationRequest {
        self.requests().pop().expect("no image request was made")
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<GeneratedImage, GatewayError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.queued.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(GeneratedImage {
                url: format!("https://provider.test/image-{n}.png"),
            })
        })
    }
}

/// Text generator with a fixed response.
pub struct FakeText {
    response: Result<String, GatewayError>,
    requests: Mutex<Vec<TextCompletionRequest>>,
}

impl FakeText {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            requests: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(GatewayError::with_status(500, "text model unavailable")),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<TextCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for FakeText {
    fn default() -> Self {
        Self::replying(r#"{"title": "The Glowing Key", "description": "A detective's strange find."}"#)
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn complete(&self, request: &TextCompletionRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

/// Storage that "re-hosts" under `https://cdn.test/{key}`.
#[derive(Default)]
pub struct FakeStorage {
    pub fail: Mutex<bool>,
    uploads: Mutex<Vec<(String, String)>>,
}

impl FakeStorage {
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeStorage {
    async fn upload(&self, source_url: &str, key: &str) -> Result<String, GatewayError> {
        if *self.fail.lock().unwrap() {
            return Err(GatewayError::transport("bucket unreachable"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((source_url.to_string(), key.to_string()));
        Ok(format!("https://cdn.test/{key}"))
    }
}

/// Recognizer returning the same blocks for every image.
#[derive(Default)]
pub struct FakeRecognizer {
    pub blocks: Vec<RecognizedText>,
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRecognizer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize_text(&self, image_url: &str) -> Result<Vec<RecognizedText>, GatewayError> {
        self.calls.lock().unwrap().push(image_url.to_string());
        if self.fail {
            return Err(GatewayError::with_status(503, "vision unavailable"));
        }
        Ok(self.blocks.clone())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub images: Arc<FakeImages>,
    pub text: Arc<FakeText>,
    pub storage: Arc<FakeStorage>,
    pub generator: PageGenerator,
}

impl Harness {
    /// Free tier disabled so tests exercise generation only.
    pub fn new() -> Self {
        Self::with(
            FakeText::default(),
            GenerationSettings {
                free_tier_pages_per_week: 0,
                ..Default::default()
            },
        )
    }

    pub fn with(text: FakeText, settings: GenerationSettings) -> Self {
        let store = Arc::new(MemoryStore::default());
        let images = Arc::new(FakeImages::default());
        let text = Arc::new(text);
        let storage = Arc::new(FakeStorage::default());
        let generator = PageGenerator::new(
            store.clone(),
            images.clone(),
            text.clone(),
            storage.clone(),
            settings,
        );
        Self {
            store,
            images,
            text,
            storage,
            generator,
        }
    }
}
