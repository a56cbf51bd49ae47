use panelcraft_core::titles::DEFAULT_TITLE_MODEL;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Generated pages allowed per user per rolling week without an own
    /// API key (default: `1`, `0` disables the limit).
    pub free_tier_pages_per_week: i64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// External provider endpoints and credentials.
    pub providers: ProviderConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                       |
    /// | `FREE_TIER_PAGES_PER_WEEK` | `1`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let free_tier_pages_per_week: i64 = std::env::var("FREE_TIER_PAGES_PER_WEEK")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("FREE_TIER_PAGES_PER_WEEK must be a valid i64");
        assert!(
            free_tier_pages_per_week >= 0,
            "FREE_TIER_PAGES_PER_WEEK must not be negative"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            free_tier_pages_per_week,
            jwt: JwtConfig::from_env(),
            providers: ProviderConfig::from_env(),
        }
    }
}

/// Endpoints and credentials of the image, text, storage and OCR providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Server-side key for the generation provider. Requests may bring their own.
    pub together_api_key: Option<String>,
    pub together_api_url: String,
    /// Model used for story titles and descriptions.
    pub title_model: String,
    pub s3_bucket: String,
    pub s3_region: String,
    /// Public URL prefix for rehosted images; derived from bucket and region when unset.
    pub s3_public_base_url: Option<String>,
    pub google_vision_api_key: Option<String>,
}

impl ProviderConfig {
    /// Load provider settings from environment variables.
    ///
    /// | Env Var                 | Required | Default                                   |
    /// |-------------------------|----------|-------------------------------------------|
    /// | `TOGETHER_API_KEY`      | no       | --                                        |
    /// | `TOGETHER_API_URL`      | no       | `https://api.together.xyz`                |
    /// | `TITLE_MODEL`           | no       | `meta-llama/Llama-3.3-70B-Instruct-Turbo` |
    /// | `S3_BUCKET`             | **yes**  | --                                        |
    /// | `S3_REGION`             | no       | `us-east-1`                               |
    /// | `S3_PUBLIC_BASE_URL`    | no       | --                                        |
    /// | `GOOGLE_VISION_API_KEY` | no       | --                                        |
    ///
    /// # Panics
    ///
    /// Panics if `S3_BUCKET` is not set or is empty.
    pub fn from_env() -> Self {
        let s3_bucket = std::env::var("S3_BUCKET").expect("S3_BUCKET must be set in the environment");
        assert!(!s3_bucket.trim().is_empty(), "S3_BUCKET must not be empty");

        Self {
            together_api_key: optional_var("TOGETHER_API_KEY"),
            together_api_url: optional_var("TOGETHER_API_URL")
                .unwrap_or_else(|| panelcraft_providers::together::DEFAULT_API_URL.into()),
            title_model: optional_var("TITLE_MODEL")
                .unwrap_or_else(|| DEFAULT_TITLE_MODEL.into()),
            s3_bucket,
            s3_region: optional_var("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            s3_public_base_url: optional_var("S3_PUBLIC_BASE_URL"),
            google_vision_api_key: optional_var("GOOGLE_VISION_API_KEY"),
        }
    }
}

/// An environment variable that counts as unset when blank.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
