//! Story slug generation.
//!
//! Slugs are random `adjective-noun-suffix` triples. Uniqueness is checked
//! by the caller against persistence; after [`MAX_SLUG_ATTEMPTS`] collisions
//! the caller switches to [`fallback_slug`].

use rand::seq::IndexedRandom;
use rand::Rng;

/// Number of random slugs tried before falling back.
pub const MAX_SLUG_ATTEMPTS: usize = 10;

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "crimson", "daring", "electric", "fearless", "gilded", "hidden", "inky",
    "jade", "lunar", "midnight", "neon", "obsidian", "phantom", "quiet", "rogue", "silver",
    "stormy", "twilight", "velvet", "wild",
];

const NOUNS: &[&str] = &[
    "alley", "beacon", "cipher", "comet", "dagger", "echo", "falcon", "harbor", "inkwell",
    "lantern", "mask", "nebula", "oracle", "panel", "quasar", "raven", "signal", "skyline",
    "tempest", "vortex", "warden", "zenith",
];

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_suffix(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Generate a random candidate slug such as `neon-falcon-x7k2`.
pub fn generate_slug() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("untitled");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("story");
    format!("{adjective}-{noun}-{}", random_suffix(&mut rng, 4))
}

/// Slug used once random candidates keep colliding.
pub fn fallback_slug(now_millis: i64) -> String {
    let mut rng = rand::rng();
    format!("story-{now_millis}-{}", random_suffix(&mut rng, 5))
}
