#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use panelcraft_core::gateway::{
    GatewayError, GeneratedImage, ImageGenerationRequest, ImageGenerator, ImageStore,
    TextCompletionRequest, TextGenerator, TextRecognizer,
};
use panelcraft_core::ocr::{BoundingBox, RecognizedText, Vertex};
use panelcraft_pipeline::{GenerationSettings, OcrService, PageGenerator, PgStoryStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

use panelcraft_api::app::build_app;
use panelcraft_api::auth::jwt::{Claims, JwtConfig};
use panelcraft_api::config::{ProviderConfig, ServerConfig};
use panelcraft_api::state::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const OWNER: &str = "user_owner";
pub const STRANGER: &str = "user_stranger";

/// Build a test `ServerConfig` with safe defaults and the free tier disabled.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        free_tier_pages_per_week: 0,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
        providers: ProviderConfig {
            together_api_key: None,
            together_api_url: "http://provider.test".to_string(),
            title_model: "test/title-model".to_string(),
            s3_bucket: "test-bucket".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_public_base_url: Some("https://cdn.test".to_string()),
            google_vision_api_key: None,
        },
    }
}

/// A pool that never connects until used and fails fast when it does.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy("postgres://panelcraft@127.0.0.1:1/panelcraft")
        .unwrap()
}

// ---------------------------------------------------------------------------
// Provider stand-ins
// ---------------------------------------------------------------------------

pub struct StaticImages;

#[async_trait]
impl ImageGenerator for StaticImages {
    async fn generate(
        &self,
        _request: &ImageGenerationRequest,
    ) -> Result<GeneratedImage, GatewayError> {
        Ok(GeneratedImage {
            url: "https://provider.test/generated.png".to_string(),
        })
    }
}

pub struct StaticText;

#[async_trait]
impl TextGenerator for StaticText {
    async fn complete(&self, _request: &TextCompletionRequest) -> Result<String, GatewayError> {
        Ok(r#"{"title": "Moon Heist", "description": "A crew robs the moon."}"#.to_string())
    }
}

pub struct CdnStorage;

#[async_trait]
impl ImageStore for CdnStorage {
    async fn upload(&self, _source_url: &str, key: &str) -> Result<String, GatewayError> {
        Ok(format!("https://cdn.test/{key}"))
    }
}

pub struct StaticRecognizer;

#[async_trait]
impl TextRecognizer for StaticRecognizer {
    async fn recognize_text(&self, _image_url: &str) -> Result<Vec<RecognizedText>, GatewayError> {
        Ok(vec![RecognizedText {
            text: "HALT!".to_string(),
            bounding_box: BoundingBox {
                vertices: vec![Vertex { x: 10.0, y: 12.0 }, Vertex { x: 60.0, y: 30.0 }],
            },
            confidence: Some(0.93),
        }])
    }
}

/// Build the full application router, backed by `pool` and the stand-in
/// providers above. Uses the same middleware stack as the binary.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let store = Arc::new(PgStoryStore::new(pool.clone()));
    let generator = PageGenerator::new(
        store.clone(),
        Arc::new(StaticImages),
        Arc::new(StaticText),
        Arc::new(CdnStorage),
        GenerationSettings {
            title_model: config.providers.title_model.clone(),
            free_tier_pages_per_week: config.free_tier_pages_per_week,
        },
    );
    let ocr = OcrService::new(store, Arc::new(StaticRecognizer));

    build_app(AppState {
        pool,
        config: Arc::new(config),
        generator: Arc::new(generator),
        ocr: Arc::new(ocr),
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// A Bearer token for `user_id` signed with [`TEST_SECRET`].
pub fn token_for(user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: Some(now),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

/// Send a request, optionally authenticated as `user` and with a JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
