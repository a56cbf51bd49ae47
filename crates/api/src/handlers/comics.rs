//! Handler for starting a new comic.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use panelcraft_core::generation::GenerationError;
use panelcraft_pipeline::GeneratedPage;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::provider_key::ProviderKey;
use crate::request::CreateComicRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/comics
///
/// Creates a story and generates its first page. The story title and
/// description are generated alongside the image.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ProviderKey(api_key): ProviderKey,
    Json(body): Json<CreateComicRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GeneratedPage>>)> {
    body.validate()
        .map_err(|e| GenerationError::Validation(e.to_string()))?;

    let page = state
        .generator
        .generate_page(body.into_page_request(auth.user_id, api_key))
        .await?;

    tracing::info!(story_id = page.story_id, slug = %page.story_slug, "Comic created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}
