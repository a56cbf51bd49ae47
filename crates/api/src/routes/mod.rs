pub mod health;
pub mod ocr;
pub mod stories;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /comics                                   create story + first page (POST)
///
/// /stories                                  list caller's stories
/// /stories/{slug}                           get (public), update, delete
/// /stories/{slug}/characters                character images used so far
/// /stories/{slug}/pages                     add page (POST)
/// /stories/{slug}/pages/{page_id}           delete page
/// /stories/{slug}/pages/{page_id}/redraw    redraw page (POST)
///
/// /ocr                                      recognize page or story (POST)
/// /ocr/pages/{page_id}                      stored text blocks
///
/// /registry                                 styles, layouts, models (public)
/// ```
///
/// Authentication is enforced per handler through the `AuthUser` extractor.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/comics", post(handlers::comics::create))
        .nest("/stories", stories::router())
        .nest("/ocr", ocr::router())
        .route("/registry", get(handlers::registry::get))
}
