//! Page generation error taxonomy, gateway failure classification and
//! request validation.

use crate::gateway::GatewayError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a page prompt in characters.
pub const MAX_PAGE_PROMPT_CHARS: usize = 10_000;

/// Maximum number of character images attached to one page.
pub const MAX_CHARACTER_IMAGES: usize = 8;

/// Lower-cased substrings that mark a provider rejection on content grounds.
pub const CONTENT_POLICY_MARKERS: &[&str] = &[
    "content policy",
    "content_policy",
    "safety system",
    "nsfw",
    "flagged as sensitive",
];

/// Rolling window for the free-tier page allowance.
pub const FREE_TIER_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every way a page generation request can fail, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Missing or malformed input; nothing was touched.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The story exists but belongs to someone else.
    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    ContentPolicy { message: String },

    #[error(
        "Insufficient API credits. Please add credits to your provider account or provide your own API key."
    )]
    CreditLimit,

    /// Any other provider failure, with the provider's status when known.
    #[error("{message}")]
    Gateway { status: u16, message: String },

    /// The image was generated but the local record could not be updated.
    /// `image_url` lets the caller retry the save without regenerating.
    #[error("Generated image could not be saved: {message}")]
    Persistence {
        message: String,
        image_url: Option<String>,
    },

    #[error(
        "Free tier limit reached. You can generate {limit} page(s) per week. Try again later, or provide your own API key."
    )]
    RateLimited { limit: i64, reset_at: Timestamp },
}

impl GenerationError {
    /// Machine-readable `errorType` value.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::ContentPolicy { .. } => "content_policy_violation",
            Self::CreditLimit => "credit_limit",
            Self::Gateway { .. } => "api_error",
            Self::Persistence { .. } => "persistence_error",
            Self::RateLimited { .. } => "rate_limited",
        }
    }

    /// HTTP status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::ContentPolicy { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Forbidden(_) => 403,
            Self::CreditLimit => 402,
            Self::Gateway { status, .. } => *status,
            Self::Persistence { .. } => 500,
            Self::RateLimited { .. } => 429,
        }
    }
}

/// Whether a provider error message indicates a content-policy rejection.
pub fn is_content_policy_violation(message: &str) -> bool {
    let lower = message.to_lowercase();
    CONTENT_POLICY_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Map a failed provider call onto the taxonomy.
///
/// - status 402 is always credit exhaustion;
/// - a content-policy marker in the message is a policy violation;
/// - anything else keeps the provider's error status, or 500.
pub fn classify_gateway_failure(error: GatewayError) -> GenerationError {
    if error.status == Some(402) {
        return GenerationError::CreditLimit;
    }
    if is_content_policy_violation(&error.message) {
        return GenerationError::ContentPolicy {
            message: error.message,
        };
    }
    let status = error
        .status
        .filter(|s| (400..=599).contains(s))
        .unwrap_or(500);
    let message = if error.message.trim().is_empty() {
        format!("Failed to generate image: {status}")
    } else {
        error.message
    };
    GenerationError::Gateway { status, message }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A page prompt must be non-blank and within [`MAX_PAGE_PROMPT_CHARS`].
pub fn validate_page_prompt(prompt: &str) -> Result<(), GenerationError> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::Validation(
            "Missing required field: prompt".to_string(),
        ));
    }
    let len = prompt.chars().count();
    if len > MAX_PAGE_PROMPT_CHARS {
        return Err(GenerationError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PAGE_PROMPT_CHARS} characters (got {len})"
        )));
    }
    Ok(())
}

/// At most [`MAX_CHARACTER_IMAGES`] character images per page.
pub fn validate_character_images(images: &[String]) -> Result<(), GenerationError> {
    if images.len() > MAX_CHARACTER_IMAGES {
        return Err(GenerationError::Validation(format!(
            "Too many character images: at most {MAX_CHARACTER_IMAGES} allowed (got {})",
            images.len()
        )));
    }
    Ok(())
}

/// Whole days until `reset_at`, rounded up, never below 1.
pub fn days_until_reset(reset_at: Timestamp, now: Timestamp) -> i64 {
    let seconds = (reset_at - now).num_seconds().max(0);
    ((seconds + 86_399) / 86_400).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
