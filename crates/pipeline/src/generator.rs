//! Create, continue and redraw comic pages.
//!
//! A single entry point, [`PageGenerator::generate_page`], serves all three
//! flows. The request's [`StoryTarget`] and optional page id select the flow:
//!
//! | target             | page id | flow                      |
//! |--------------------|---------|---------------------------|
//! | `New`              | `None`  | new story with page 1     |
//! | `Existing { .. }`  | `None`  | append the next page      |
//! | `Existing { .. }`  | `Some`  | redraw that page in place |
//!
//! Rows are written before the image call so a failure can be cleaned up:
//! a failed first page removes the whole story, a failed appended page
//! removes that page, and a failed redraw leaves the page untouched.
//! Two redraws of the same page race; the last write wins.

use std::sync::Arc;

use chrono::{Duration, Utc};
use panelcraft_core::gateway::{
    GatewayError, GeneratedImage, ImageGenerationRequest, ImageGenerator, ImageStore,
    TextCompletionRequest, TextGenerator,
};
use panelcraft_core::generation::{
    classify_gateway_failure, validate_character_images, validate_page_prompt, GenerationError,
    FREE_TIER_WINDOW_DAYS,
};
use panelcraft_core::prompt::{compose, PriorPage, PromptRequest};
use panelcraft_core::references::assemble_reference_set;
use panelcraft_core::registry::{resolve_image_model, resolve_layout, resolve_style};
use panelcraft_core::slug::{fallback_slug, generate_slug, MAX_SLUG_ATTEMPTS};
use panelcraft_core::titles::{
    fallback_title, parse_story_metadata, title_messages, StoryMetadata, DEFAULT_TITLE_MODEL,
    TITLE_MAX_TOKENS, TITLE_TEMPERATURE,
};
use panelcraft_core::types::{DbId, UserId};
use panelcraft_db::models::page::{CreatePage, Page, RedrawPage};
use panelcraft_db::models::story::{CreateStory, Story, UpdateStory};
use serde::Serialize;

use crate::store::{StoreError, StoryStore};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Which story a page belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryTarget {
    /// Start a new story; the page becomes page 1.
    New,
    /// An existing story, addressed by slug.
    Existing { slug: String },
}

/// Everything needed to generate one page. Preferences travel with the
/// request; nothing is read from ambient state.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub user_id: UserId,
    pub target: StoryTarget,
    /// Present for a redraw of an existing page.
    pub page_id: Option<DbId>,
    pub prompt: String,
    /// Only used when creating a story; existing stories keep their style.
    pub style: Option<String>,
    pub layout: Option<String>,
    pub model: Option<String>,
    /// `None` on a redraw reuses the page's stored character images.
    pub character_images: Option<Vec<String>>,
    pub is_continuation: bool,
    pub previous_context: Option<String>,
    pub story_summary: Option<String>,
    pub character_descriptions: Option<String>,
    pub custom_system_prompt: Option<String>,
    /// Caller's own provider key. Exempts the request from the free tier.
    pub api_key: Option<String>,
}

impl PageRequest {
    pub fn new(user_id: impl Into<UserId>, target: StoryTarget, prompt: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            target,
            page_id: None,
            prompt: prompt.into(),
            style: None,
            layout: None,
            model: None,
            character_images: None,
            is_continuation: false,
            previous_context: None,
            story_summary: None,
            character_descriptions: None,
            custom_system_prompt: None,
            api_key: None,
        }
    }

    fn has_custom_prompt(&self) -> bool {
        self.custom_system_prompt
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPage {
    pub story_id: DbId,
    pub story_slug: String,
    pub page_id: DbId,
    pub page_number: i32,
    /// Permanent (re-hosted) image URL.
    pub image_url: String,
    /// Set when a new story was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub title_model: String,
    /// Pages per rolling week for requests without an own API key.
    /// Zero disables the limit.
    pub free_tier_pages_per_week: i64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            title_model: DEFAULT_TITLE_MODEL.to_string(),
            free_tier_pages_per_week: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct PageGenerator {
    store: Arc<dyn StoryStore>,
    images: Arc<dyn ImageGenerator>,
    text: Arc<dyn TextGenerator>,
    storage: Arc<dyn ImageStore>,
    settings: GenerationSettings,
}

fn persistence(err: StoreError) -> GenerationError {
    tracing::error!(error = %err, "Store operation failed");
    GenerationError::Persistence {
        message: err.to_string(),
        image_url: None,
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn prior_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Vec<PriorPage> {
    pages
        .into_iter()
        .map(|p| PriorPage {
            page_number: p.page_number,
            prompt: p.prompt.clone(),
        })
        .collect()
}

impl PageGenerator {
    pub fn new(
        store: Arc<dyn StoryStore>,
        images: Arc<dyn ImageGenerator>,
        text: Arc<dyn TextGenerator>,
        storage: Arc<dyn ImageStore>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            images,
            text,
            storage,
            settings,
        }
    }

    /// Generate a page for a new story, append one, or redraw one.
    ///
    /// Validation and ownership failures return before anything is written.
    pub async fn generate_page(
        &self,
        request: PageRequest,
    ) -> Result<GeneratedPage, GenerationError> {
        validate_page_prompt(&request.prompt)?;
        if let Some(images) = &request.character_images {
            validate_character_images(images)?;
        }

        match &request.target {
            StoryTarget::New => {
                if request.page_id.is_some() {
                    return Err(GenerationError::Validation(
                        "A page id requires an existing story".to_string(),
                    ));
                }
                self.check_free_tier(&request).await?;
                self.create_story(&request).await
            }
            StoryTarget::Existing { slug } => {
                if slug.trim().is_empty() {
                    return Err(GenerationError::Validation(
                        "Missing required field: storyId".to_string(),
                    ));
                }
                let story = self.owned_story(slug, &request.user_id).await?;
                self.check_free_tier(&request).await?;
                match request.page_id {
                    None => self.add_page(&story, &request).await,
                    Some(page_id) => self.redraw_page(&story, page_id, &request).await,
                }
            }
        }
    }

    // ---- flows ----

    async fn create_story(&self, request: &PageRequest) -> Result<GeneratedPage, GenerationError> {
        let style = resolve_style(request.style.as_deref());
        let layout = resolve_layout(request.layout.as_deref());
        let model = resolve_image_model(request.model.as_deref());
        let story_summary = non_blank(request.story_summary.as_ref());
        let character_descriptions = non_blank(request.character_descriptions.as_ref());

        let mut input = CreateStory {
            slug: self.allocate_slug().await?,
            title: fallback_title(&request.prompt),
            description: None,
            style: style.id.to_string(),
            user_id: request.user_id.clone(),
            story_summary: story_summary.clone(),
            character_descriptions: character_descriptions.clone(),
            uses_own_api_key: request.api_key.is_some(),
        };
        let story = match self.store.create_story(&input).await {
            Err(StoreError::SlugTaken(taken)) => {
                input.slug = fallback_slug(Utc::now().timestamp_millis());
                tracing::warn!(%taken, slug = %input.slug, "Slug taken concurrently, using fallback");
                self.store.create_story(&input).await
            }
            other => other,
        }
        .map_err(persistence)?;
        tracing::info!(story_id = story.id, slug = %story.slug, "Story created");

        let characters = request.character_images.clone().unwrap_or_default();
        let page_input = CreatePage {
            story_id: story.id,
            page_number: 1,
            prompt: request.prompt.clone(),
            character_image_urls: characters.clone(),
            model: Some(model.id.to_string()),
            layout: Some(layout.id.to_string()),
            is_custom_prompt: request.has_custom_prompt(),
        };
        let page = match self.store.create_page(&page_input).await {
            Ok(page) => page,
            Err(err) => {
                self.discard_story(story.id).await;
                return Err(persistence(err));
            }
        };

        let references = assemble_reference_set(None, &characters);
        let prompt = compose(&PromptRequest {
            prompt: request.prompt.clone(),
            style: Some(style.id.to_string()),
            layout: Some(layout.id.to_string()),
            reference_images: references.clone(),
            is_continuation: request.is_continuation,
            previous_context: request.previous_context.clone(),
            is_add_page: false,
            previous_pages: Vec::new(),
            summary: story_summary,
            character_descriptions,
            custom_system_prompt: request.custom_system_prompt.clone(),
        });
        let image_request = image_request(request, model.id, prompt, references);

        tracing::info!(
            story_id = story.id,
            page_id = page.id,
            reference_count = image_request.reference_images.len(),
            "Generating first page",
        );
        let (metadata, generated) = tokio::join!(
            self.generate_metadata(request, style.id),
            self.images.generate(&image_request),
        );

        let image_url = match self.rehost(generated, story.id, page.page_number).await {
            Ok(url) => url,
            Err(err) => {
                self.discard_story(story.id).await;
                return Err(err);
            }
        };
        self.log_generation(&request.user_id, page.id).await;
        let page = self.save_image(page.id, &image_url).await?;

        let update = UpdateStory {
            title: Some(metadata.title.clone()),
            description: metadata.description.clone(),
            ..Default::default()
        };
        if let Err(err) = self.store.update_story(story.id, &update).await {
            tracing::warn!(story_id = story.id, error = %err, "Failed to store generated title");
        }

        Ok(GeneratedPage {
            story_id: story.id,
            story_slug: story.slug,
            page_id: page.id,
            page_number: page.page_number,
            image_url,
            title: Some(metadata.title),
            description: metadata.description,
        })
    }

    async fn add_page(
        &self,
        story: &Story,
        request: &PageRequest,
    ) -> Result<GeneratedPage, GenerationError> {
        let layout = resolve_layout(request.layout.as_deref());
        let model = resolve_image_model(request.model.as_deref());

        let pages = self.store.list_pages(story.id).await.map_err(persistence)?;
        let page_number = self
            .store
            .next_page_number(story.id)
            .await
            .map_err(persistence)?;
        let previous_image = if page_number > 1 {
            self.store
                .last_page_image(story.id)
                .await
                .map_err(persistence)?
        } else {
            None
        };

        let characters = request.character_images.clone().unwrap_or_default();
        let references = assemble_reference_set(previous_image.as_deref(), &characters);
        let prompt = compose(&continuation_prompt(
            request,
            story,
            layout.id,
            references.clone(),
            prior_pages(&pages),
        ));

        let page = self
            .store
            .create_page(&CreatePage {
                story_id: story.id,
                page_number,
                prompt: request.prompt.clone(),
                character_image_urls: characters,
                model: Some(model.id.to_string()),
                layout: Some(layout.id.to_string()),
                is_custom_prompt: request.has_custom_prompt(),
            })
            .await
            .map_err(persistence)?;

        tracing::info!(
            story_id = story.id,
            page_id = page.id,
            page_number,
            reference_count = references.len(),
            "Generating page",
        );
        let generated = self
            .images
            .generate(&image_request(request, model.id, prompt, references))
            .await;

        let image_url = match self.rehost(generated, story.id, page_number).await {
            Ok(url) => url,
            Err(err) => {
                self.discard_page(page.id).await;
                return Err(err);
            }
        };
        self.log_generation(&request.user_id, page.id).await;
        let page = self.save_image(page.id, &image_url).await?;
        self.touch_story(story.id).await;

        Ok(GeneratedPage {
            story_id: story.id,
            story_slug: story.slug.clone(),
            page_id: page.id,
            page_number: page.page_number,
            image_url,
            title: None,
            description: None,
        })
    }

    async fn redraw_page(
        &self,
        story: &Story,
        page_id: DbId,
        request: &PageRequest,
    ) -> Result<GeneratedPage, GenerationError> {
        let pages = self.store.list_pages(story.id).await.map_err(persistence)?;
        let target = pages
            .iter()
            .find(|p| p.id == page_id)
            .ok_or(GenerationError::NotFound { entity: "Page" })?;

        // Only pages before the target shape its context.
        let earlier: Vec<&Page> = pages
            .iter()
            .filter(|p| p.page_number < target.page_number)
            .collect();
        let previous_image = earlier
            .iter()
            .rev()
            .find_map(|p| p.generated_image_url.clone());

        let characters = match &request.character_images {
            Some(images) if !images.is_empty() => images.clone(),
            _ => target.character_image_urls.0.clone(),
        };
        let layout = resolve_layout(request.layout.as_deref().or(target.layout.as_deref()));
        let model = resolve_image_model(request.model.as_deref().or(target.model.as_deref()));

        let references = assemble_reference_set(previous_image.as_deref(), &characters);
        let prompt = compose(&continuation_prompt(
            request,
            story,
            layout.id,
            references.clone(),
            prior_pages(earlier.iter().copied()),
        ));

        tracing::info!(
            story_id = story.id,
            page_id,
            page_number = target.page_number,
            reference_count = references.len(),
            "Redrawing page",
        );
        let generated = self
            .images
            .generate(&image_request(request, model.id, prompt, references))
            .await;
        let image_url = self
            .rehost(generated, story.id, target.page_number)
            .await?;
        self.log_generation(&request.user_id, page_id).await;

        let redraw = RedrawPage {
            prompt: request.prompt.clone(),
            character_image_urls: characters,
            model: Some(model.id.to_string()),
            layout: Some(layout.id.to_string()),
            is_custom_prompt: request.has_custom_prompt(),
        };
        let page = match self.store.record_redraw(page_id, &redraw, &image_url).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                return Err(GenerationError::Persistence {
                    message: "Page was deleted during generation".to_string(),
                    image_url: Some(image_url),
                })
            }
            Err(err) => {
                tracing::error!(page_id, error = %err, "Failed to save redrawn page");
                return Err(GenerationError::Persistence {
                    message: err.to_string(),
                    image_url: Some(image_url),
                });
            }
        };
        self.touch_story(story.id).await;

        Ok(GeneratedPage {
            story_id: story.id,
            story_slug: story.slug.clone(),
            page_id: page.id,
            page_number: page.page_number,
            image_url,
            title: None,
            description: None,
        })
    }

    // ---- steps ----

    async fn owned_story(&self, slug: &str, user_id: &str) -> Result<Story, GenerationError> {
        let story = self
            .store
            .find_story_by_slug(slug)
            .await
            .map_err(persistence)?
            .ok_or(GenerationError::NotFound { entity: "Story" })?;
        if !story.is_owned_by(user_id) {
            return Err(GenerationError::Forbidden(
                "You do not have access to this story".to_string(),
            ));
        }
        Ok(story)
    }

    async fn check_free_tier(&self, request: &PageRequest) -> Result<(), GenerationError> {
        let limit = self.settings.free_tier_pages_per_week;
        if request.api_key.is_some() || limit <= 0 {
            return Ok(());
        }

        let now = Utc::now();
        let window = Duration::days(FREE_TIER_WINDOW_DAYS);
        let (count, oldest) = self
            .store
            .generated_since(&request.user_id, now - window)
            .await
            .map_err(persistence)?;
        if count >= limit {
            let reset_at = oldest.unwrap_or(now) + window;
            tracing::info!(user_id = %request.user_id, count, limit, "Free tier limit reached");
            return Err(GenerationError::RateLimited { limit, reset_at });
        }
        Ok(())
    }

    async fn allocate_slug(&self) -> Result<String, GenerationError> {
        for _ in 0..MAX_SLUG_ATTEMPTS {
            let candidate = generate_slug();
            if !self
                .store
                .slug_exists(&candidate)
                .await
                .map_err(persistence)?
            {
                return Ok(candidate);
            }
        }
        let slug = fallback_slug(Utc::now().timestamp_millis());
        tracing::warn!(%slug, attempts = MAX_SLUG_ATTEMPTS, "Slug attempts exhausted, using fallback");
        Ok(slug)
    }

    /// Title and description for a new story. Never fails: any text
    /// gateway or parsing problem yields the prompt-derived fallback.
    async fn generate_metadata(&self, request: &PageRequest, style_id: &str) -> StoryMetadata {
        let completion = TextCompletionRequest {
            model: self.settings.title_model.clone(),
            messages: title_messages(&request.prompt, style_id),
            max_tokens: TITLE_MAX_TOKENS,
            temperature: TITLE_TEMPERATURE,
            api_key: request.api_key.clone(),
        };
        let fallback = || StoryMetadata {
            title: fallback_title(&request.prompt),
            description: None,
        };

        match self.text.complete(&completion).await {
            Ok(text) => parse_story_metadata(&text).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Unusable title response, using fallback");
                fallback()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "Title generation failed, using fallback");
                fallback()
            }
        }
    }

    /// Classify a failed image call, or copy the image to permanent storage.
    async fn rehost(
        &self,
        generated: Result<GeneratedImage, GatewayError>,
        story_id: DbId,
        page_number: i32,
    ) -> Result<String, GenerationError> {
        let image = generated.map_err(|err| {
            tracing::error!(story_id, page_number, status = ?err.status, error = %err, "Image generation failed");
            classify_gateway_failure(err)
        })?;

        let key = format!(
            "{story_id}/page-{page_number}-{}.jpg",
            Utc::now().timestamp_millis()
        );
        self.storage.upload(&image.url, &key).await.map_err(|err| {
            tracing::error!(story_id, page_number, %key, error = %err, "Image upload failed");
            classify_gateway_failure(err)
        })
    }

    /// Count a finished image against the user's free-tier window.
    async fn log_generation(&self, user_id: &str, page_id: DbId) {
        if let Err(err) = self.store.record_generation(user_id, page_id).await {
            tracing::warn!(user_id, page_id, error = %err, "Failed to log image generation");
        }
    }

    async fn save_image(&self, page_id: DbId, image_url: &str) -> Result<Page, GenerationError> {
        match self.store.set_page_image(page_id, image_url).await {
            Ok(Some(page)) => Ok(page),
            Ok(None) => Err(GenerationError::Persistence {
                message: "Page was deleted during generation".to_string(),
                image_url: Some(image_url.to_string()),
            }),
            Err(err) => {
                tracing::error!(page_id, error = %err, "Failed to save generated image");
                Err(GenerationError::Persistence {
                    message: err.to_string(),
                    image_url: Some(image_url.to_string()),
                })
            }
        }
    }

    async fn discard_story(&self, story_id: DbId) {
        match self.store.delete_story(story_id).await {
            Ok(()) => tracing::info!(story_id, "Removed story after failed first page"),
            Err(err) => {
                tracing::warn!(story_id, error = %err, "Failed to remove story after failed first page")
            }
        }
    }

    async fn discard_page(&self, page_id: DbId) {
        match self.store.delete_page(page_id).await {
            Ok(()) => tracing::info!(page_id, "Removed page after failed generation"),
            Err(err) => {
                tracing::warn!(page_id, error = %err, "Failed to remove page after failed generation")
            }
        }
    }

    async fn touch_story(&self, story_id: DbId) {
        if let Err(err) = self.store.touch_story(story_id).await {
            tracing::warn!(story_id, error = %err, "Failed to bump story timestamp");
        }
    }
}

/// Prompt request for a page of an existing story.
fn continuation_prompt(
    request: &PageRequest,
    story: &Story,
    layout_id: &str,
    reference_images: Vec<String>,
    previous_pages: Vec<PriorPage>,
) -> PromptRequest {
    PromptRequest {
        prompt: request.prompt.clone(),
        style: Some(story.style.clone()),
        layout: Some(layout_id.to_string()),
        reference_images,
        is_continuation: request.is_continuation,
        previous_context: request.previous_context.clone(),
        is_add_page: !previous_pages.is_empty(),
        previous_pages,
        summary: non_blank(request.story_summary.as_ref())
            .or_else(|| story.story_summary.clone()),
        character_descriptions: non_blank(request.character_descriptions.as_ref())
            .or_else(|| story.character_descriptions.clone()),
        custom_system_prompt: request.custom_system_prompt.clone(),
    }
}

/// Image request sized for the model and whether references are attached.
fn image_request(
    request: &PageRequest,
    model_id: &str,
    prompt: String,
    reference_images: Vec<String>,
) -> ImageGenerationRequest {
    let model = resolve_image_model(Some(model_id));
    let dimensions = model.dimensions(!reference_images.is_empty());
    ImageGenerationRequest {
        model: model.model_id.to_string(),
        prompt,
        width: dimensions.width,
        height: dimensions.height,
        reference_images,
        api_key: request.api_key.clone(),
    }
}
