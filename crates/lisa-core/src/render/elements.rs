//! Reply rendering types

use serde::{Deserialize, Serialize};

/// Popup title for images found inside reply text
pub const INLINE_IMAGE_TITLE: &str = "Image";

/// One unit of rendered reply content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Formatted markup (may contain `<strong>`/`<em>`)
    Text { markup: String },
    /// Resolvable image reference
    Image { url: String, alt: String },
}

impl ContentSegment {
    pub fn text(markup: impl Into<String>) -> Self {
        Self::Text {
            markup: markup.into(),
        }
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::Image {
            url: url.into(),
            alt: alt.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// Header row plus data rows; ragged rows are kept as they came
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// Widest row, header included
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Raw output of table block detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSegment {
    Text(String),
    /// Text of a detected table block, not yet parsed
    Table(String),
}

/// A block of a tabular reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableBlock {
    /// Text around tables, shown as-is
    Text { content: String },
    Table(ParsedTable),
}

/// Target of a click-to-enlarge image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePopup {
    pub url: String,
    pub title: String,
}

/// How a reply should be displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum RenderInstruction {
    /// Reply carried a structured image: caption plus enlargeable image
    AttachedImage {
        caption: String,
        title: String,
        image_url: String,
        /// Shown when `image_url` fails to load
        fallback_url: String,
    },
    /// Reply contains at least one pipe table
    TableRender { blocks: Vec<TableBlock> },
    /// Formatted text interleaved with inline images
    SegmentedRender { segments: Vec<ContentSegment> },
    /// Formatted text only
    PlainRender { markup: String },
}

impl RenderInstruction {
    /// Images the user can click to enlarge, in display order
    pub fn popups(&self) -> Vec<ImagePopup> {
        match self {
            Self::AttachedImage {
                title, image_url, ..
            } => vec![ImagePopup {
                url: image_url.clone(),
                title: title.clone(),
            }],
            Self::SegmentedRender { segments } => segments
                .iter()
                .filter_map(|segment| match segment {
                    ContentSegment::Image { url, .. } => Some(ImagePopup {
                        url: url.clone(),
                        title: INLINE_IMAGE_TITLE.to_string(),
                    }),
                    ContentSegment::Text { .. } => None,
                })
                .collect(),
            Self::TableRender { .. } | Self::PlainRender { .. } => Vec::new(),
        }
    }
}
