//! Page generation orchestration.
//!
//! [`generator::PageGenerator`] drives the create, add-page and redraw
//! flows over the gateway ports; [`ocr::OcrService`] extracts lettering from
//! generated pages. Both reach the database only through [`store::StoryStore`].

pub mod generator;
pub mod ocr;
pub mod store;

pub use generator::{GeneratedPage, GenerationSettings, PageGenerator, PageRequest, StoryTarget};
pub use ocr::{OcrError, OcrPageResult, OcrService};
pub use store::{PgStoryStore, StoreError, StoryStore};
