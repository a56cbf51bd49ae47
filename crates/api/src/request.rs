//! Request bodies accepted by the API, with their `validator` rules.
//!
//! Generation bodies only enforce structural limits here; blank prompts and
//! missing identifiers are rejected by the orchestrator so every generation
//! failure shares one error shape.

use panelcraft_core::types::{DbId, UserId};
use panelcraft_pipeline::{PageRequest, StoryTarget};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// `POST /comics` -- start a story with its first page.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComicRequest {
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub prompt: String,
    pub style: Option<String>,
    pub layout: Option<String>,
    pub model: Option<String>,
    #[validate(length(max = 8))]
    pub character_images: Option<Vec<String>>,
    pub story_summary: Option<String>,
    pub character_descriptions: Option<String>,
    pub custom_system_prompt: Option<String>,
}

impl CreateComicRequest {
    pub fn into_page_request(self, user_id: UserId, api_key: Option<String>) -> PageRequest {
        let mut request = PageRequest::new(user_id, StoryTarget::New, self.prompt);
        request.style = self.style;
        request.layout = self.layout;
        request.model = self.model;
        request.character_images = self.character_images;
        request.story_summary = self.story_summary;
        request.character_descriptions = self.character_descriptions;
        request.custom_system_prompt = self.custom_system_prompt;
        request.api_key = api_key;
        request
    }
}

/// `POST /stories/{slug}/pages` -- append a page.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPageRequest {
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub prompt: String,
    pub layout: Option<String>,
    pub model: Option<String>,
    #[validate(length(max = 8))]
    pub character_images: Option<Vec<String>>,
    /// Free-text recap of earlier pages, used instead of their stored prompts.
    pub previous_context: Option<String>,
    pub custom_system_prompt: Option<String>,
}

impl AddPageRequest {
    pub fn into_page_request(
        self,
        user_id: UserId,
        slug: String,
        api_key: Option<String>,
    ) -> PageRequest {
        let mut request = PageRequest::new(user_id, StoryTarget::Existing { slug }, self.prompt);
        request.layout = self.layout;
        request.model = self.model;
        request.character_images = self.character_images;
        request.is_continuation = true;
        request.previous_context = self.previous_context;
        request.custom_system_prompt = self.custom_system_prompt;
        request.api_key = api_key;
        request
    }
}

/// `POST /stories/{slug}/pages/{page_id}/redraw` -- regenerate a page in place.
///
/// An absent or empty `characterImages` keeps the page's stored list; absent
/// `layout` and `model` keep the stored values.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedrawPageRequest {
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub prompt: String,
    pub layout: Option<String>,
    pub model: Option<String>,
    #[validate(length(max = 8))]
    pub character_images: Option<Vec<String>>,
    pub custom_system_prompt: Option<String>,
}

impl RedrawPageRequest {
    pub fn into_page_request(
        self,
        user_id: UserId,
        slug: String,
        page_id: DbId,
        api_key: Option<String>,
    ) -> PageRequest {
        let mut request = PageRequest::new(user_id, StoryTarget::Existing { slug }, self.prompt);
        request.page_id = Some(page_id);
        request.layout = self.layout;
        request.model = self.model;
        request.character_images = self.character_images;
        request.custom_system_prompt = self.custom_system_prompt;
        request.api_key = api_key;
        request
    }
}

/// `PUT /stories/{slug}` -- edit the user-facing story fields.
///
/// Empty `summary` or `characterDescriptions` strings are stored as cleared.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoryRequest {
    #[validate(custom(function = "non_blank"), length(max = 60))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    pub summary: Option<String>,
    pub character_descriptions: Option<String>,
}

impl UpdateStoryRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.summary.is_none()
            && self.character_descriptions.is_none()
    }
}

/// `POST /ocr` -- recognize one page, or every imaged page of a story.
/// `storyId` wins when both are given.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "page_or_story"))]
pub struct OcrRequest {
    pub page_id: Option<DbId>,
    pub story_id: Option<DbId>,
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Title must be a non-empty string".into());
        return Err(err);
    }
    Ok(())
}

fn page_or_story(request: &OcrRequest) -> Result<(), ValidationError> {
    if request.page_id.is_none() && request.story_id.is_none() {
        let mut err = ValidationError::new("missing_target");
        err.message = Some("Either pageId or storyId is required".into());
        return Err(err);
    }
    Ok(())
}
