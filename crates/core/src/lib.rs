//! Domain logic for comic page generation.
//!
//! Everything in this crate is pure or expressed through the async ports in
//! [`gateway`]; it has no database or HTTP dependencies.

pub mod consistency;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod ocr;
pub mod prompt;
pub mod references;
pub mod registry;
pub mod slug;
pub mod titles;
pub mod types;
