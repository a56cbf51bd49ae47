//! Handlers for the `/stories` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use panelcraft_core::error::CoreError;
use panelcraft_core::references::story_character_images;
use panelcraft_db::models::page::Page;
use panelcraft_db::models::story::{Story, StoryListItem, UpdateStory};
use panelcraft_db::repositories::{PageRepo, StoryRepo};
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::request::UpdateStoryRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// A story with its pages, as shown to any visitor.
#[derive(Debug, Serialize)]
pub struct StoryDetail {
    pub story: Story,
    pub pages: Vec<Page>,
    /// Whether the caller owns the story; `false` for anonymous visitors.
    pub is_owner: bool,
}

/// Load a story by slug and require that `user_id` owns it.
pub(crate) async fn owned_story(state: &AppState, slug: &str, user_id: &str) -> AppResult<Story> {
    let story = find_story(state, slug).await?;
    if !story.is_owned_by(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this story".into(),
        )));
    }
    Ok(story)
}

async fn find_story(state: &AppState, slug: &str) -> AppResult<Story> {
    StoryRepo::find_by_slug(&state.pool, slug)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "Story",
                key: slug.to_string(),
            })
        })
}

/// GET /api/v1/stories
///
/// The caller's stories, most recently updated first.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<StoryListItem>>>> {
    let stories = StoryRepo::list_by_user(&state.pool, &auth.user_id).await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/stories/{slug}
///
/// Public; a valid token only sets `is_owner`.
pub async fn get_by_slug(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<StoryDetail>>> {
    let story = find_story(&state, &slug).await?;
    let pages = PageRepo::list_by_story(&state.pool, story.id).await?;
    let is_owner = viewer
        .user_id()
        .is_some_and(|user_id| story.is_owned_by(user_id));

    Ok(Json(DataResponse {
        data: StoryDetail {
            story,
            pages,
            is_owner,
        },
    }))
}

/// PUT /api/v1/stories/{slug}
///
/// Edits title, description, summary and character descriptions. The slug
/// never changes.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<UpdateStoryRequest>,
) -> AppResult<Json<DataResponse<Story>>> {
    let story = owned_story(&state, &slug, &auth.user_id).await?;

    body.validate()?;
    if body.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let input = UpdateStory {
        title: body.title.map(|t| t.trim().to_string()),
        description: body.description,
        story_summary: body.summary,
        character_descriptions: body.character_descriptions,
    };
    let updated = StoryRepo::update(&state.pool, story.id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Story",
            id: story.id,
        }))?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/stories/{slug}
///
/// Pages and their text blocks are removed with the story.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    let story = owned_story(&state, &slug, &auth.user_id).await?;
    StoryRepo::delete(&state.pool, story.id).await?;
    tracing::info!(story_id = story.id, slug = %story.slug, "Story deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/stories/{slug}/characters
///
/// Every character image used in the story, first appearance first.
pub async fn characters(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let story = owned_story(&state, &slug, &auth.user_id).await?;
    let pages = PageRepo::list_by_story(&state.pool, story.id).await?;
    let images = story_character_images(pages.iter().map(|p| p.character_image_urls.as_slice()));
    Ok(Json(DataResponse { data: images }))
}
