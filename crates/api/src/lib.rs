//! HTTP surface of the comic page generation service.
//!
//! Exposes the router pieces, configuration and error mapping so the binary
//! and the integration tests assemble the same application.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routes;
pub mod state;
