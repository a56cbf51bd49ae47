//! Request extractors shared by handlers.
//!
//! - [`auth::AuthUser`] -- the authenticated caller, from a JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- the caller if a valid token is present.
//! - [`provider_key::ProviderKey`] -- a caller-supplied provider API key.

pub mod auth;
pub mod provider_key;
