//! Route definitions for the `/stories` resource and its pages.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{pages, stories};
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// GET    /                                -> list
/// GET    /{slug}                          -> get_by_slug (auth optional)
/// PUT    /{slug}                          -> update
/// DELETE /{slug}                          -> delete
/// GET    /{slug}/characters               -> characters
///
/// POST   /{slug}/pages                    -> add
/// DELETE /{slug}/pages/{page_id}          -> delete
/// POST   /{slug}/pages/{page_id}/redraw   -> redraw
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list))
        .route(
            "/{slug}",
            get(stories::get_by_slug)
                .put(stories::update)
                .delete(stories::delete),
        )
        .route("/{slug}/characters", get(stories::characters))
        .route("/{slug}/pages", post(pages::add))
        .route("/{slug}/pages/{page_id}", delete(pages::delete))
        .route("/{slug}/pages/{page_id}/redraw", post(pages::redraw))
}
