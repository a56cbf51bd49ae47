//! Final prompt assembly for the image-generation model.
//!
//! [`compose`] is a pure function of [`PromptRequest`]: it reads no clock,
//! no randomness and no ambient configuration, so the same request always
//! yields the same bytes.

use crate::consistency::consistency_block;
use crate::registry::{resolve_layout, resolve_style};

/// Separator between the instruction text and the user's story text.
pub const STORY_MARKER: &str = "\n\nSTORY:\n";

const HEADER: &str = "Professional comic book page illustration.";

const PRIORITY_RULES: &str = "CHARACTER CONSISTENCY RULES (HIGHEST PRIORITY):
- If reference images are provided, the characters' FACES must be 100% identical to the reference images
- Never change hair color, eye color, facial structure, or distinctive features
- Apply comic style to body/pose/action but preserve exact facial appearance
- Same character must look identical across all panels they appear in";

const LETTERING_RULES: &str = "TEXT AND LETTERING (CRITICAL):
- All text in speech bubbles must be PERFECTLY CLEAR, LEGIBLE, and correctly spelled
- Use bold clean comic book lettering, large and easy to read
- Speech bubbles: crisp white fill, solid black outline, pointed tail toward speaker
- Keep dialogue SHORT: maximum 1-2 sentences per bubble
- NO blurry, warped, or unreadable text";

const COMPOSITION_GUIDANCE: &str = "COMPOSITION:
- Vary camera angles across panels: close-up, medium shot, wide establishing shot
- Natural visual flow following the layout's reading order
- Dynamic character poses with clear expressive acting
- Detailed backgrounds matching the scene and mood";

/// Prompt text of an earlier page, used for add-page and redraw context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorPage {
    pub page_number: i32,
    pub prompt: String,
}

/// Everything the composer needs. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptRequest {
    /// The user's description of this page.
    pub prompt: String,
    pub style: Option<String>,
    pub layout: Option<String>,
    /// Ordered, de-duplicated reference images sent alongside the prompt.
    pub reference_images: Vec<String>,
    pub is_continuation: bool,
    /// Free-text description of the previous page (continuation form).
    pub previous_context: Option<String>,
    pub is_add_page: bool,
    /// Earlier pages in page-number order (add-page form).
    pub previous_pages: Vec<PriorPage>,
    pub summary: Option<String>,
    pub character_descriptions: Option<String>,
    /// Full replacement for every generated section.
    pub custom_system_prompt: Option<String>,
}

/// Build the final prompt string.
pub fn compose(request: &PromptRequest) -> String {
    if let Some(custom) = request
        .custom_system_prompt
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        return format!("{custom}{STORY_MARKER}{}", request.prompt);
    }

    let style = resolve_style(request.style.as_deref());
    let layout = resolve_layout(request.layout.as_deref());
    let characters = consistency_block(&request.reference_images, style.id, layout.panel_count);

    let mut sections: Vec<String> = vec![HEADER.to_string()];

    if let Some(overview) = story_overview(request) {
        sections.push(overview);
    }
    if let Some(continuation) = continuation_context(request) {
        sections.push(continuation);
    }
    if !characters.is_empty() {
        sections.push(characters.as_str().to_string());
    }
    sections.push(PRIORITY_RULES.to_string());
    sections.push(LETTERING_RULES.to_string());
    sections.push(layout.prompt_fragment());

    let mut art_style = format!("ART STYLE:\n{}", style.prompt);
    if !characters.is_empty() {
        art_style.push_str("\n\n");
        art_style.push_str(characters.as_str());
    }
    sections.push(art_style);
    sections.push(COMPOSITION_GUIDANCE.to_string());

    format!("{}{STORY_MARKER}{}", sections.join("\n\n"), request.prompt)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn story_overview(request: &PromptRequest) -> Option<String> {
    let mut paragraphs = Vec::new();
    if let Some(summary) = non_blank(request.summary.as_deref()) {
        paragraphs.push(format!("STORY OVERVIEW:\n{summary}"));
    }
    if let Some(descriptions) = non_blank(request.character_descriptions.as_deref()) {
        paragraphs.push(format!("CHARACTER DESCRIPTIONS:\n{descriptions}"));
    }
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

/// The add-page form replaces the single-context form when both apply.
fn continuation_context(request: &PromptRequest) -> Option<String> {
    let mut context = None;

    if request.is_continuation {
        if let Some(previous) = non_blank(request.previous_context.as_deref()) {
            context = Some(format!(
                "CONTINUATION CONTEXT:
This is a continuation of an existing story. The previous page showed: {previous}
Maintain visual consistency with the previous panels. Continue the narrative naturally."
            ));
        }
    }

    if request.is_add_page && !request.previous_pages.is_empty() {
        let history: Vec<String> = request
            .previous_pages
            .iter()
            // Stored numbers, so gaps left by deleted pages stay visible.
            .map(|page| format!("Page {}: {}", page.page_number, page.prompt))
            .collect();
        context = Some(format!(
            "STORY CONTINUATION CONTEXT:
This is a continuation of an existing comic story. Here are the previous pages:
{}

The new page should naturally continue this story. Maintain the same characters, setting, and narrative style. Reference previous events and build upon them.",
            history.join("\n")
        ));
    }

    context
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
