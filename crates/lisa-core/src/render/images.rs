//! Inline image extraction

use once_cell::sync::Lazy;
use regex::Regex;

use super::elements::ContentSegment;

/// Alt label given to images found inside reply text
pub const INLINE_IMAGE_ALT: &str = "Chat content";

static IMG_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src="([^">]+)"[^>]*>"#).unwrap());

/// Split formatted text on `<img ... src="...">` tags
pub fn extract_images(formatted: &str) -> Vec<ContentSegment> {
    extract_images_with_alt(formatted, INLINE_IMAGE_ALT)
}

/// Like [`extract_images`], labelling every image with `alt`.
///
/// Text segments keep their original bytes; tags without a quoted `src`
/// stay in the text.
pub fn extract_images_with_alt(formatted: &str, alt: &str) -> Vec<ContentSegment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in IMG_TAG_REGEX.captures_iter(formatted) {
        let (Some(tag), Some(src)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if tag.start() > last_end {
            segments.push(ContentSegment::text(&formatted[last_end..tag.start()]));
        }
        segments.push(ContentSegment::image(src.as_str(), alt));
        last_end = tag.end();
    }

    if last_end < formatted.len() {
        segments.push(ContentSegment::text(&formatted[last_end..]));
    }

    segments
}
