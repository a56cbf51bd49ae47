//! OCR result types shared by the recognizer port and persistence.

use serde::{Deserialize, Serialize};

/// A polygon vertex in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub vertices: Vec<Vertex>,
}

/// One recognized word or phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    pub bounding_box: BoundingBox,
    /// Provider confidence in `0.0..=1.0`, when reported.
    pub confidence: Option<f32>,
}

/// Stored confidence: whole percent, clamped to `0..=100`.
pub fn confidence_percent(confidence: Option<f32>) -> Option<i32> {
    confidence.map(|c| (c.clamp(0.0, 1.0) * 100.0).round() as i32)
}

/// Space-joined text of all blocks, in recognition order.
pub fn full_text(blocks: &[RecognizedText]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
