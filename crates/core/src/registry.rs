//! Static style, layout and image-model lookup tables.
//!
//! Every lookup is infallible: unknown identifiers resolve to a fixed
//! default so prompt composition always has a usable fragment.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// A named visual style and the prompt fragment describing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComicStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

/// Style used when a request names no style or an unknown one.
pub const DEFAULT_STYLE_ID: &str = "noir";

pub const STYLES: &[ComicStyle] = &[
    ComicStyle {
        id: "american-modern",
        name: "American Modern",
        prompt: "contemporary American superhero comic style, bold vibrant colors, dynamic heroic poses, detailed muscular anatomy, cinematic action scenes, modern digital art",
    },
    ComicStyle {
        id: "manga",
        name: "Manga",
        prompt: "Japanese manga style, clean precise black linework, screen tone shading, expressive eyes, dynamic speed lines, black and white with impact effects",
    },
    ComicStyle {
        id: "noir",
        name: "Noir",
        prompt: "film noir style, high contrast black and white, deep dramatic shadows, 1940s detective aesthetic, heavy bold inking, moody atmospheric lighting",
    },
    ComicStyle {
        id: "vintage",
        name: "Vintage",
        prompt: "Golden Age 1950s comic style, visible halftone Ben-Day dots, limited retro color palette, nostalgic warm tones, classic adventure comics",
    },
    ComicStyle {
        id: "superhero",
        name: "Superhero",
        prompt: "classic American superhero comic style, bold vibrant colors, dynamic heroic poses, detailed muscular anatomy, Jim Lee and Jack Kirby inspired",
    },
    ComicStyle {
        id: "modern",
        name: "Modern",
        prompt: "contemporary digital comic art, smooth gradient coloring, detailed realistic backgrounds, cinematic widescreen composition, graphic novel quality",
    },
    ComicStyle {
        id: "watercolor",
        name: "Watercolor",
        prompt: "painted watercolor comic style, soft blended edges, flowing artistic colors, delicate linework with painted fills, ethereal atmosphere",
    },
];

/// Resolve a style id, falling back to [`DEFAULT_STYLE_ID`].
pub fn resolve_style(style_id: Option<&str>) -> &'static ComicStyle {
    style_id
        .and_then(|id| STYLES.iter().find(|s| s.id == id))
        .unwrap_or_else(default_style)
}

/// Prompt fragment for a style id, falling back to noir.
pub fn style_description(style_id: Option<&str>) -> &'static str {
    resolve_style(style_id).prompt
}

fn default_style() -> &'static ComicStyle {
    STYLES
        .iter()
        .find(|s| s.id == DEFAULT_STYLE_ID)
        .unwrap_or(&STYLES[0])
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// How the panels of a layout are arranged on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Single column of full-width strips, read top to bottom.
    Webtoon,
    /// Two panels, one large hero panel, two panels.
    Classic,
}

/// A named panel arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLayout {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: LayoutKind,
    pub panel_count: u32,
}

/// Layout used when a request names no layout or an unknown one.
pub const DEFAULT_LAYOUT_ID: &str = "webtoon-6-panel";

pub const LAYOUTS: &[PageLayout] = &[
    PageLayout {
        id: "webtoon-2-panel",
        name: "2 Panels",
        description: "Vertical scroll, 1 column × 2 rows",
        kind: LayoutKind::Webtoon,
        panel_count: 2,
    },
    PageLayout {
        id: "webtoon-3-panel",
        name: "3 Panels",
        description: "Vertical scroll, 1 column × 3 rows",
        kind: LayoutKind::Webtoon,
        panel_count: 3,
    },
    PageLayout {
        id: "webtoon-4-panel",
        name: "4 Panels",
        description: "Vertical scroll, 1 column × 4 rows",
        kind: LayoutKind::Webtoon,
        panel_count: 4,
    },
    PageLayout {
        id: "webtoon-5-panel",
        name: "5 Panels",
        description: "Vertical scroll, 1 column × 5 rows",
        kind: LayoutKind::Webtoon,
        panel_count: 5,
    },
    PageLayout {
        id: "webtoon-6-panel",
        name: "6 Panels",
        description: "Vertical scroll, 1 column × 6 rows",
        kind: LayoutKind::Webtoon,
        panel_count: 6,
    },
    PageLayout {
        id: "classic-5-panel",
        name: "Classic Page",
        description: "2 panels, 1 hero panel, 2 panels",
        kind: LayoutKind::Classic,
        panel_count: 5,
    },
];

impl PageLayout {
    /// Render the `PAGE LAYOUT:` section for this layout.
    pub fn prompt_fragment(&self) -> String {
        match self.kind {
            LayoutKind::Webtoon => webtoon_fragment(self.panel_count),
            LayoutKind::Classic => CLASSIC_FRAGMENT.to_string(),
        }
    }
}

const CLASSIC_FRAGMENT: &str = "PAGE LAYOUT:
5-panel comic page arranged as:
[Panel 1] [Panel 2] — top row, 2 equal panels
[    Panel 3      ] — middle row, 1 large cinematic hero panel
[Panel 4] [Panel 5] — bottom row, 2 equal panels
- Solid black panel borders with clean white gutters between panels
- Each panel clearly separated and distinct";

fn webtoon_fragment(panel_count: u32) -> String {
    let mut rows = Vec::with_capacity(panel_count as usize);
    for n in 1..=panel_count {
        let position = match n {
            1 if panel_count == 1 => " (full page)",
            1 => " (top)",
            n if n == panel_count => " (bottom)",
            _ => "",
        };
        rows.push(format!("[  Panel {n}  ] — row {n}{position}"));
    }

    format!(
        "PAGE LAYOUT:
Vertical webtoon-style comic strip with 1 column and {panel_count} stacked rows:
{}
- All panels stacked vertically in a SINGLE COLUMN, NO side-by-side panels
- Each panel is a wide horizontal strip spanning the full width
- Solid black panel borders with clean white gutters between rows
- Reading order: top to bottom (vertical scroll format)
- This is a webtoon/vertical scroll format — NOT a traditional comic page grid",
        rows.join("\n")
    )
}

/// Resolve a layout id, falling back to [`DEFAULT_LAYOUT_ID`].
pub fn resolve_layout(layout_id: Option<&str>) -> &'static PageLayout {
    layout_id
        .and_then(|id| LAYOUTS.iter().find(|l| l.id == id))
        .unwrap_or_else(default_layout)
}

/// Layout section text and panel count, falling back to the default layout.
pub fn layout_description(layout_id: Option<&str>) -> (String, u32) {
    let layout = resolve_layout(layout_id);
    (layout.prompt_fragment(), layout.panel_count)
}

fn default_layout() -> &'static PageLayout {
    LAYOUTS
        .iter()
        .find(|l| l.id == DEFAULT_LAYOUT_ID)
        .unwrap_or(&LAYOUTS[0])
}

// ---------------------------------------------------------------------------
// Image models
// ---------------------------------------------------------------------------

/// Requested output size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An image-generation model and its two dimension presets.
///
/// The model family accepts a different aspect ratio when reference images
/// are attached, so each model carries both presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageModel {
    pub id: &'static str,
    pub name: &'static str,
    /// Identifier sent to the image-generation provider.
    pub model_id: &'static str,
    pub description: &'static str,
    pub dimensions_with_ref: Dimensions,
    pub dimensions_without_ref: Dimensions,
}

/// Model used when a request names no model or an unknown one.
pub const DEFAULT_IMAGE_MODEL_ID: &str = "flash-image-2.5";

pub const IMAGE_MODELS: &[ImageModel] = &[
    ImageModel {
        id: "flash-image-2.5",
        name: "Flash 2.5",
        model_id: "google/flash-image-2.5",
        description: "Fast, good quality",
        dimensions_with_ref: Dimensions {
            width: 864,
            height: 1184,
        },
        dimensions_without_ref: Dimensions {
            width: 768,
            height: 1344,
        },
    },
    ImageModel {
        id: "gemini-3-pro",
        name: "Gemini 3 Pro",
        model_id: "google/gemini-3-pro-image",
        description: "Best quality, slower",
        dimensions_with_ref: Dimensions {
            width: 896,
            height: 1200,
        },
        dimensions_without_ref: Dimensions {
            width: 768,
            height: 1376,
        },
    },
];

impl ImageModel {
    /// Pick the dimension preset for a request.
    pub fn dimensions(&self, has_reference_images: bool) -> Dimensions {
        if has_reference_images {
            self.dimensions_with_ref
        } else {
            self.dimensions_without_ref
        }
    }
}

/// Resolve a model id, falling back to [`DEFAULT_IMAGE_MODEL_ID`].
pub fn resolve_image_model(model_id: Option<&str>) -> &'static ImageModel {
    model_id
        .and_then(|id| IMAGE_MODELS.iter().find(|m| m.id == id))
        .unwrap_or(&IMAGE_MODELS[0])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
