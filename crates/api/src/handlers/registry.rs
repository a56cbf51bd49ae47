//! Handler exposing the style, layout and image-model tables.

use axum::Json;
use panelcraft_core::registry::{
    ComicStyle, ImageModel, PageLayout, DEFAULT_IMAGE_MODEL_ID, DEFAULT_LAYOUT_ID,
    DEFAULT_STYLE_ID, IMAGE_MODELS, LAYOUTS, STYLES,
};
use serde::Serialize;

use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct Registry {
    pub styles: &'static [ComicStyle],
    pub layouts: &'static [PageLayout],
    pub image_models: &'static [ImageModel],
    pub defaults: RegistryDefaults,
}

#[derive(Debug, Serialize)]
pub struct RegistryDefaults {
    pub style: &'static str,
    pub layout: &'static str,
    pub image_model: &'static str,
}

/// GET /api/v1/registry
///
/// Public. Lets the UI offer exactly the identifiers the server resolves.
pub async fn get() -> Json<DataResponse<Registry>> {
    Json(DataResponse {
        data: Registry {
            styles: STYLES,
            layouts: LAYOUTS,
            image_models: IMAGE_MODELS,
            defaults: RegistryDefaults {
                style: DEFAULT_STYLE_ID,
                layout: DEFAULT_LAYOUT_ID,
                image_model: DEFAULT_IMAGE_MODEL_ID,
            },
        },
    })
}
