//! Character face-consistency instructions.
//!
//! The number of reference images selects a [`CharacterPolicy`]; the policy
//! renders one instruction block whose wording adapts to the layout's panel
//! count. The composer inserts the same rendered block twice.

/// Named ordinals used for the first five reference images.
const NAMED_ORDINALS: [&str; 5] = ["FIRST", "SECOND", "THIRD", "FOURTH", "FIFTH"];

/// Consistency template chosen from the reference image count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterPolicy {
    /// No reference images: no block at all.
    Unconstrained,
    /// One protagonist who appears in every panel.
    Single,
    /// Two distinct characters sharing most panels.
    Dual,
    /// Three or more characters, each labeled by ordinal.
    Ensemble(usize),
}

impl CharacterPolicy {
    pub fn for_count(count: usize) -> Self {
        match count {
            0 => Self::Unconstrained,
            1 => Self::Single,
            2 => Self::Dual,
            n => Self::Ensemble(n),
        }
    }
}

/// A rendered consistency block, inserted verbatim at each insertion point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyBlock(String);

impl ConsistencyBlock {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordinal label for the `position`-th (1-based) reference image.
///
/// Positions 1-5 use words; later positions use numeric ordinals (`6TH`,
/// `21ST`, `112TH`).
pub fn ordinal_label(position: usize) -> String {
    if let Some(word) = position
        .checked_sub(1)
        .and_then(|i| NAMED_ORDINALS.get(i))
    {
        return (*word).to_string();
    }
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "TH",
        (1, _) => "ST",
        (2, _) => "ND",
        (3, _) => "RD",
        _ => "TH",
    };
    format!("{position}{suffix}")
}

/// Panels in which every character must be present: "ALL N panels".
fn every_panel_phrase(panel_count: u32) -> String {
    if panel_count <= 1 {
        "the panel".to_string()
    } else {
        format!("ALL {panel_count} panels")
    }
}

/// Co-presence requirement: at least `max(1, N - 1)` of the N panels.
fn co_presence_phrase(panel_count: u32) -> String {
    if panel_count <= 1 {
        return "the panel".to_string();
    }
    let required = panel_count.saturating_sub(1).max(1);
    format!("at least {required} of the {panel_count} panels")
}

/// Render the consistency block for an ordered reference image list.
pub fn consistency_block(
    reference_images: &[String],
    style_id: &str,
    panel_count: u32,
) -> ConsistencyBlock {
    let text = match CharacterPolicy::for_count(reference_images.len()) {
        CharacterPolicy::Unconstrained => String::new(),
        CharacterPolicy::Single => single_block(style_id, panel_count),
        CharacterPolicy::Dual => dual_block(style_id, panel_count),
        CharacterPolicy::Ensemble(count) => ensemble_block(count, style_id, panel_count),
    };
    ConsistencyBlock(text)
}

fn single_block(style_id: &str, panel_count: u32) -> String {
    let every = every_panel_phrase(panel_count);
    format!(
        "CRITICAL FACE CONSISTENCY INSTRUCTIONS:
- REFERENCE CHARACTER: Use the uploaded image as EXACT reference for the protagonist's face and appearance
- FACE MATCHING: The character's face must be IDENTICAL to the reference image - same eyes, nose, mouth, hair, facial structure
- APPEARANCE PRESERVATION: Maintain exact skin tone, hair color/style, eye color, and distinctive facial features
- CHARACTER CONSISTENCY: This exact same character must appear in {every} with the same face throughout
- STYLE APPLICATION: Apply {style_id} comic art style to the body/pose/action but KEEP THE FACE EXACTLY AS IN THE REFERENCE IMAGE
- NO VARIATION: Do not alter, modify, or change the character's face in any way from the reference"
    )
}

fn dual_block(style_id: &str, panel_count: u32) -> String {
    let presence = co_presence_phrase(panel_count);
    format!(
        "CRITICAL DUAL CHARACTER FACE CONSISTENCY INSTRUCTIONS:
- CHARACTER 1 REFERENCE: Use the FIRST uploaded image as EXACT reference for Character 1's face and appearance
- CHARACTER 2 REFERENCE: Use the SECOND uploaded image as EXACT reference for Character 2's face and appearance
- FACE MATCHING: Both characters' faces must be IDENTICAL to their respective reference images
- VISUAL DISTINCTION: Keep both characters clearly visually distinct with their unique faces, hair, and features
- CONSISTENT PRESENCE: Both characters must appear together in {presence}
- STYLE APPLICATION: Apply {style_id} comic art style while maintaining EXACT facial features from references
- NO FACE VARIATION: Never alter or modify either character's face from their reference images"
    )
}

fn ensemble_block(count: usize, style_id: &str, panel_count: u32) -> String {
    let presence = co_presence_phrase(panel_count);
    let references: Vec<String> = (1..=count)
        .map(|n| {
            format!(
                "- CHARACTER {n} REFERENCE: Use the {} uploaded image as EXACT reference for Character {n}'s face and appearance",
                ordinal_label(n)
            )
        })
        .collect();

    format!(
        "CRITICAL MULTI-CHARACTER FACE CONSISTENCY INSTRUCTIONS ({count} CHARACTERS):
{}
- FACE MATCHING: Every character's face must be IDENTICAL to its own reference image
- VISUAL DISTINCTION: Keep all {count} characters clearly visually distinct with their unique faces, hair, and features
- CONSISTENT PRESENCE: All {count} characters must appear together in {presence}
- STYLE APPLICATION: Apply {style_id} comic art style while maintaining EXACT facial features from references
- NO FACE VARIATION: Never alter or modify any character's face from their reference images",
        references.join("\n")
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
