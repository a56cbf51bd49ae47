//! Reference image set assembly.

use std::collections::HashSet;

/// Build the ordered, de-duplicated reference image set for one page.
///
/// The previous page's generated image (when present) anchors style and
/// characters and always comes first; the page's selected character images
/// follow. The first occurrence of a URL keeps its position. Blank entries
/// are dropped.
pub fn assemble_reference_set(
    previous_page_image: Option<&str>,
    character_images: &[String],
) -> Vec<String> {
    dedupe_preserving_order(
        previous_page_image
            .into_iter()
            .chain(character_images.iter().map(String::as_str)),
    )
}

/// Union of character images used across a story's pages, in page order.
///
/// `pages` must already be sorted by page number.
pub fn story_character_images<'a, I>(pages: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    dedupe_preserving_order(
        pages
            .into_iter()
            .flat_map(|images| images.iter().map(String::as_str)),
    )
}

fn dedupe_preserving_order<'a>(urls: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.map(str::trim)
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}
