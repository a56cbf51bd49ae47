//! Ports for the external services a page generation depends on.
//!
//! Concrete HTTP/S3 adapters live in `panelcraft-providers`; tests supply
//! in-memory fakes. Every port reports failures as [`GatewayError`] so the
//! orchestrator can classify them uniformly.

use async_trait::async_trait;
use serde::Serialize;

use crate::ocr::RecognizedText;

/// Failure of an external call, with the provider's HTTP status when known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub status: Option<u16>,
    pub message: String,
}

impl GatewayError {
    /// Error reported by the provider with an HTTP status.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Network, decoding or configuration failure with no provider status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenerationRequest {
    /// Provider model identifier, e.g. `google/flash-image-2.5`.
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub reference_images: Vec<String>,
    /// Caller-supplied provider key; the adapter's own key is used when `None`.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Transient provider URL; re-host before persisting.
    pub url: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &ImageGenerationRequest)
        -> Result<GeneratedImage, GatewayError>;
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_key: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the text of the first completion choice.
    async fn complete(&self, request: &TextCompletionRequest) -> Result<String, GatewayError>;
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Copy the image at `source_url` to `key` and return its permanent URL.
    async fn upload(&self, source_url: &str, key: &str) -> Result<String, GatewayError>;
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize_text(&self, image_url: &str) -> Result<Vec<RecognizedText>, GatewayError>;
}
