//! Row structs and DTOs.
//!
//! Each submodule pairs a `FromRow` + `Serialize` entity with the
//! `Deserialize` DTOs used to create or patch it.

pub mod page;
pub mod story;
pub mod text_block;
