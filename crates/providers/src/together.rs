//! Together AI client for image generation and chat completions.
//!
//! Both endpoints share one [`reqwest::Client`]. A per-request API key,
//! when present, replaces the server's default key.

use async_trait::async_trait;
use panelcraft_core::gateway::{
    ChatMessage, GatewayError, GeneratedImage, ImageGenerationRequest, ImageGenerator,
    TextCompletionRequest, TextGenerator,
};
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.together.xyz";

/// Errors from the Together REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum TogetherError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Together returned a non-2xx status code.
    #[error("Together API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No API key configured for Together")]
    MissingApiKey,

    /// A 2xx response without the expected payload.
    #[error("{0}")]
    EmptyResponse(&'static str),
}

impl From<TogetherError> for GatewayError {
    fn from(err: TogetherError) -> Self {
        match err {
            TogetherError::Api { status, message } => GatewayError::with_status(status, message),
            TogetherError::Request(e) => match e.status() {
                Some(status) => GatewayError::with_status(status.as_u16(), e.to_string()),
                None => GatewayError::transport(e.to_string()),
            },
            other => GatewayError::transport(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ImageRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    n: u32,
    #[serde(skip_serializing_if = "no_references")]
    reference_images: &'a [String],
}

fn no_references(refs: &&[String]) -> bool {
    refs.is_empty()
}

#[derive(Debug, Deserialize)]
struct ImageResponseBody {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// `{"error": {"message": ...}}`, the shape of Together error bodies.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Human-readable message from an error body, falling back to the raw text.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail { message: Some(m) },
        }) if !m.trim().is_empty() => m,
        _ if body.trim().is_empty() => format!("Failed to generate image: {status}"),
        _ => body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Together API.
pub struct TogetherClient {
    client: reqwest::Client,
    api_url: String,
    default_api_key: Option<String>,
}

impl TogetherClient {
    /// * `api_url` - Base URL, e.g. [`DEFAULT_API_URL`].
    /// * `default_api_key` - Server key used when a request carries none.
    pub fn new(api_url: String, default_api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, default_api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        default_api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            default_api_key,
        }
    }

    fn resolve_key<'a>(&'a self, override_key: Option<&'a str>) -> Result<&'a str, TogetherError> {
        override_key
            .filter(|k| !k.trim().is_empty())
            .or(self.default_api_key.as_deref())
            .ok_or(TogetherError::MissingApiKey)
    }

    /// `POST /v1/images/generations`, returning the first image URL.
    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<String, TogetherError> {
        let key = self.resolve_key(request.api_key.as_deref())?;
        let body = ImageRequestBody {
            model: &request.model,
            prompt: &request.prompt,
            width: request.width,
            height: request.height,
            n: 1,
            reference_images: &request.reference_images,
        };

        tracing::debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            reference_count = request.reference_images.len(),
            "Requesting image generation",
        );

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.api_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let parsed: ImageResponseBody = Self::parse_response(response).await?;
        parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or(TogetherError::EmptyResponse("No image URL in response"))
    }

    /// `POST /v1/chat/completions`, returning the first choice's content.
    pub async fn chat(&self, request: &TextCompletionRequest) -> Result<String, TogetherError> {
        let key = self.resolve_key(request.api_key.as_deref())?;
        let body = ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponseBody = Self::parse_response(response).await?;
        parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(TogetherError::EmptyResponse("No completion in response"))
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TogetherError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TogetherError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TogetherError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ImageGenerator for TogetherClient {
    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<GeneratedImage, GatewayError> {
        let url = self.generate_image(request).await?;
        Ok(GeneratedImage { url })
    }
}

#[async_trait]
impl TextGenerator for TogetherClient {
    async fn complete(&self, request: &TextCompletionRequest) -> Result<String, GatewayError> {
        Ok(self.chat(request).await?)
    }
}
