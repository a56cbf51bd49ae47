//! Google Cloud Vision text detection over REST.

use async_trait::async_trait;
use panelcraft_core::gateway::{GatewayError, TextRecognizer};
use panelcraft_core::ocr::{BoundingBox, RecognizedText, Vertex};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_API_URL: &str = "https://vision.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Vision API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Per-image error reported inside a 200 response.
    #[error("Vision annotation failed: {0}")]
    Annotation(String),
}

impl From<VisionError> for GatewayError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Api { status, body } => GatewayError::with_status(status, body),
            other => GatewayError::transport(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<StatusBody>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<Polygon>,
}

#[derive(Debug, Deserialize)]
struct Polygon {
    #[serde(default)]
    vertices: Vec<RawVertex>,
}

/// Vision omits zero coordinates.
#[derive(Debug, Deserialize)]
struct RawVertex {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

/// Convert an annotate response into word-level blocks.
///
/// The first annotation is the whole-image text and is skipped. Text
/// detection reports no per-word confidence.
fn parse_annotations(response: AnnotateResponse) -> Result<Vec<RecognizedText>, VisionError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(error) = first.error {
        return Err(VisionError::Annotation(
            error.message.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    Ok(first
        .text_annotations
        .into_iter()
        .skip(1)
        .map(|a| RecognizedText {
            text: a.description,
            bounding_box: BoundingBox {
                vertices: a
                    .bounding_poly
                    .map(|p| p.vertices)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|v| Vertex { x: v.x, y: v.y })
                    .collect(),
            },
            confidence: None,
        })
        .collect())
}

pub struct GoogleVisionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GoogleVisionClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// `POST /v1/images:annotate` with a single `TEXT_DETECTION` request.
    pub async fn detect_text(&self, image_url: &str) -> Result<Vec<RecognizedText>, VisionError> {
        let body = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_url } },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.api_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_annotations(response.json::<AnnotateResponse>().await?)
    }
}

#[async_trait]
impl TextRecognizer for GoogleVisionClient {
    async fn recognize_text(&self, image_url: &str) -> Result<Vec<RecognizedText>, GatewayError> {
        Ok(self.detect_text(image_url).await?)
    }
}
