pub mod comics;
pub mod ocr;
pub mod pages;
pub mod registry;
pub mod stories;
