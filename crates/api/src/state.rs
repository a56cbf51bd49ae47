use std::sync::Arc;

use panelcraft_pipeline::{OcrService, PageGenerator};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by read and edit handlers.
    pub pool: panelcraft_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Create / add / redraw orchestrator.
    pub generator: Arc<PageGenerator>,
    pub ocr: Arc<OcrService>,
}
