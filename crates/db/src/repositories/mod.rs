//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod generation_repo;
pub mod page_repo;
pub mod story_repo;
pub mod text_block_repo;

pub use generation_repo::GenerationRepo;
pub use page_repo::PageRepo;
pub use story_repo::StoryRepo;
pub use text_block_repo::TextBlockRepo;
