//! HTTP and S3 adapters for the ports declared in `panelcraft_core::gateway`.

pub mod storage;
pub mod together;
pub mod vision;

pub use storage::S3ImageStore;
pub use together::TogetherClient;
pub use vision::GoogleVisionClient;
