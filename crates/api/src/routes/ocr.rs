use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ocr;
use crate::state::AppState;

/// Routes mounted at `/ocr`.
///
/// ```text
/// POST   /                     -> recognize
/// GET    /pages/{page_id}      -> page_text_blocks
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(ocr::recognize))
        .route("/pages/{page_id}", get(ocr::page_text_blocks))
}
