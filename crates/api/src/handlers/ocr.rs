//! Handlers for page text recognition.

use axum::extract::{Path, State};
use axum::Json;
use panelcraft_core::error::CoreError;
use panelcraft_core::types::DbId;
use panelcraft_db::models::text_block::PageTextBlock;
use panelcraft_db::repositories::{PageRepo, StoryRepo, TextBlockRepo};
use panelcraft_pipeline::OcrPageResult;
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::request::OcrRequest;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PageTextBlocks {
    pub page_id: DbId,
    pub text_blocks: Vec<PageTextBlock>,
}

/// POST /api/v1/ocr
///
/// Recognizes the text of one page, or of every imaged page of a story when
/// `storyId` is given. Always answers with a list of page results.
pub async fn recognize(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OcrRequest>,
) -> AppResult<Json<DataResponse<Vec<OcrPageResult>>>> {
    body.validate()?;

    let results = match (body.story_id, body.page_id) {
        (Some(story_id), _) => state.ocr.process_story(&auth.user_id, story_id).await?,
        (None, Some(page_id)) => vec![state.ocr.process_page(&auth.user_id, page_id).await?],
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either pageId or storyId is required".into(),
            ))
        }
    };
    Ok(Json(DataResponse { data: results }))
}

/// GET /api/v1/ocr/pages/{page_id}
///
/// Stored text blocks of a page from its last recognition run.
pub async fn page_text_blocks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(page_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PageTextBlocks>>> {
    let page = PageRepo::find_by_id(&state.pool, page_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Page",
            id: page_id,
        }))?;

    let owned = StoryRepo::find_by_id(&state.pool, page.story_id)
        .await?
        .is_some_and(|story| story.is_owned_by(&auth.user_id));
    if !owned {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this page".into(),
        )));
    }

    let text_blocks = TextBlockRepo::list_by_page(&state.pool, page_id).await?;
    Ok(Json(DataResponse {
        data: PageTextBlocks {
            page_id,
            text_blocks,
        },
    }))
}
