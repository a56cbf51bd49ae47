//! Story title and description generation helpers.
//!
//! The text model is asked for a JSON object but may wrap it in prose, so
//! the response is scanned for the outermost `{ ... }` before parsing.
//! Lengths are enforced here, not trusted from the model.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::CoreError;
use crate::gateway::ChatMessage;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 60;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Prompt prefix length used for the fallback title.
pub const FALLBACK_TITLE_CHARS: usize = 50;

/// Default model for title generation.
pub const DEFAULT_TITLE_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

pub const TITLE_MAX_TOKENS: u32 = 200;

pub const TITLE_TEMPERATURE: f32 = 0.7;

const ELLIPSIS: &str = "...";

/// Outermost JSON object: first `{` through last `}`.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Title and description for a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryMetadata {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct RawMetadata {
    title: Option<String>,
    description: Option<String>,
}

/// Truncate to `max_chars` characters, ending in `...` when shortened.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Title used when title generation fails: the prompt's first
/// [`FALLBACK_TITLE_CHARS`] characters plus `...` when longer.
pub fn fallback_title(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.chars().count() > FALLBACK_TITLE_CHARS {
        let mut title: String = prompt.chars().take(FALLBACK_TITLE_CHARS).collect();
        title.push_str(ELLIPSIS);
        title
    } else {
        prompt.to_string()
    }
}

/// Extract the outermost JSON object from free-form model output.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(text).map(|m| m.as_str())
}

/// Parse a model response into length-limited [`StoryMetadata`].
pub fn parse_story_metadata(response: &str) -> Result<StoryMetadata, CoreError> {
    let json = extract_json_object(response).ok_or_else(|| {
        CoreError::Validation("Title response contains no JSON object".to_string())
    })?;

    let raw: RawMetadata = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Title response is not valid JSON: {e}")))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CoreError::Validation("Title response has an empty title".to_string()))?;

    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .map(|d| truncate_with_ellipsis(&d, MAX_DESCRIPTION_CHARS));

    Ok(StoryMetadata {
        title: truncate_with_ellipsis(&title, MAX_TITLE_CHARS),
        description,
    })
}

/// Chat messages asking the text model for a title and description.
pub fn title_messages(prompt: &str, style_id: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You name comic books. Given a comic page idea, reply with ONLY a JSON object of the form \
             {{\"title\": \"...\", \"description\": \"...\"}}. The title must be at most \
             {MAX_TITLE_CHARS} characters and catchy. The description must be at most \
             {MAX_DESCRIPTION_CHARS} characters and summarize the premise."
        )),
        ChatMessage::user(format!("Style: {style_id}\nComic idea: {prompt}")),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
