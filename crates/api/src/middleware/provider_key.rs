//! Caller-supplied provider API key.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the caller's own generation provider key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The trimmed `x-api-key` header value; blank or non-UTF-8 values count as absent.
///
/// A present key is used for the provider calls of the request and exempts it
/// from the free-tier limit.
#[derive(Debug, Clone, Default)]
pub struct ProviderKey(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ProviderKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(ProviderKey(key))
    }
}
