//! Handlers for pages of an existing story.
//!
//! `/stories/{slug}/pages[/{page_id}[/redraw]]`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use panelcraft_core::error::CoreError;
use panelcraft_core::generation::GenerationError;
use panelcraft_core::types::DbId;
use panelcraft_db::repositories::{PageRepo, StoryRepo};
use panelcraft_pipeline::GeneratedPage;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::stories::owned_story;
use crate::middleware::auth::AuthUser;
use crate::middleware::provider_key::ProviderKey;
use crate::request::{AddPageRequest, RedrawPageRequest};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/stories/{slug}/pages
///
/// Appends a page numbered one past the highest existing page.
pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    ProviderKey(api_key): ProviderKey,
    Path(slug): Path<String>,
    Json(body): Json<AddPageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GeneratedPage>>)> {
    body.validate()
        .map_err(|e| GenerationError::Validation(e.to_string()))?;

    let page = state
        .generator
        .generate_page(body.into_page_request(auth.user_id, slug, api_key))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}

/// POST /api/v1/stories/{slug}/pages/{page_id}/redraw
///
/// Regenerates a page in place using only the pages before it as context.
/// The page keeps its number and previous image if generation fails.
pub async fn redraw(
    State(state): State<AppState>,
    auth: AuthUser,
    ProviderKey(api_key): ProviderKey,
    Path((slug, page_id)): Path<(String, DbId)>,
    Json(body): Json<RedrawPageRequest>,
) -> AppResult<Json<DataResponse<GeneratedPage>>> {
    body.validate()
        .map_err(|e| GenerationError::Validation(e.to_string()))?;

    let page = state
        .generator
        .generate_page(body.into_page_request(auth.user_id, slug, page_id, api_key))
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// DELETE /api/v1/stories/{slug}/pages/{page_id}
///
/// Remaining pages keep their numbers.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((slug, page_id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let story = owned_story(&state, &slug, &auth.user_id).await?;

    let page = PageRepo::find_by_id(&state.pool, page_id)
        .await?
        .filter(|p| p.story_id == story.id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Page",
            id: page_id,
        }))?;

    PageRepo::delete(&state.pool, page.id).await?;
    StoryRepo::touch(&state.pool, story.id).await?;

    tracing::info!(story_id = story.id, page_id, page_number = page.page_number, "Page deleted");
    Ok(StatusCode::NO_CONTENT)
}
