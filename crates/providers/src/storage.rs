//! Re-hosting of generated images in S3.
//!
//! Provider image URLs expire, so every generated image is downloaded and
//! written to the bucket before its URL is persisted.

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use panelcraft_core::gateway::{GatewayError, ImageStore};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to download source image: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Source image request returned {status}")]
    SourceStatus { status: u16 },

    #[error("S3 upload failed: {0}")]
    Upload(String),
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        GatewayError::transport(err.to_string())
    }
}

/// Public URL of an object: `{base}/{key}` with exactly one slash between.
pub fn object_url(public_base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        public_base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Default public base URL for a bucket without a CDN in front of it.
pub fn default_public_base_url(bucket: &str, region: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com")
}

pub struct S3ImageStore {
    http: reqwest::Client,
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageStore {
    /// Build a store using the default AWS credential chain.
    pub async fn from_env(bucket: String, region: String, public_base_url: Option<String>) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        let public_base_url =
            public_base_url.unwrap_or_else(|| default_public_base_url(&bucket, &region));
        Self {
            http: reqwest::Client::new(),
            s3: aws_sdk_s3::Client::new(&sdk_config),
            bucket,
            public_base_url,
        }
    }

    /// Download `source_url` and store it under `key`, returning its public URL.
    pub async fn rehost(&self, source_url: &str, key: &str) -> Result<String, StorageError> {
        let response = self.http.get(source_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::SourceStatus {
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?;

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key, "Image re-hosted");
        Ok(object_url(&self.public_base_url, key))
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, source_url: &str, key: &str) -> Result<String, GatewayError> {
        Ok(self.rehost(source_url, key).await?)
    }
}
