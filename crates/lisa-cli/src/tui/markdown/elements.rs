//! Inline markup element types

/// Inline content parsed from reply markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineContent {
    /// Plain text
    Text(String),
    /// `<strong>` text
    Bold(Vec<InlineContent>),
    /// `<em>` text
    Italic(Vec<InlineContent>),
}
