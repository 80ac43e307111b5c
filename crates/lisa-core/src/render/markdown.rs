//! Emphasis formatting
//!
//! Converts the two markdown emphasis forms replies use into markup:
//! `**bold**` -> `<strong>bold</strong>`, then `*italic*` -> `<em>italic</em>`.
//! Everything else passes through untouched. Bold runs first so a double
//! asterisk is never read as two italic delimiters.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());

/// Apply bold then italic conversion. Pairs never span a line break.
pub fn format(text: &str) -> String {
    if !text.contains('*') {
        return text.to_string();
    }
    let bolded = BOLD_REGEX.replace_all(text, "<strong>${1}</strong>");
    ITALIC_REGEX
        .replace_all(&bolded, "<em>${1}</em>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            format("**Brake** pipe and *angle cock*"),
            "<strong>Brake</strong> pipe and <em>angle cock</em>"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "Check the coupler | pin\nthen release.";
        assert_eq!(format(text), text);
    }

    #[test]
    fn test_unpaired_asterisk_left_alone() {
        assert_eq!(format("5 * 3 = 15"), "5 * 3 = 15");
    }

    #[test]
    fn test_pairs_do_not_cross_lines() {
        assert_eq!(format("*open\nclose*"), "*open\nclose*");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let once = format("**a** then *b* and **c**");
        assert_eq!(format(&once), once);
    }
}
