//! Reply classification
//!
//! Picks exactly one rendering strategy per reply, in priority order:
//! attached image, tables, inline images, plain formatted text.

use serde::{Deserialize, Serialize};

use super::elements::{ContentSegment, RenderInstruction, TableBlock, TableSegment};
use super::images::{extract_images_with_alt, INLINE_IMAGE_ALT};
use super::markdown;
use super::table::{extract_tables, parse_table};
use crate::assistant::{ImageAttachment, ReplyPayload};

/// Image shown when an attached image fails to load
pub const DEFAULT_FALLBACK_IMAGE: &str = "/fallback-image.jpg";

/// Presentation settings (`[render]` in the config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fallback_image_url: String,
    pub inline_image_alt: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fallback_image_url: DEFAULT_FALLBACK_IMAGE.to_string(),
            inline_image_alt: INLINE_IMAGE_ALT.to_string(),
        }
    }
}

/// Turns reply payloads into render instructions
#[derive(Debug, Clone, Default)]
pub struct RenderDispatcher {
    config: RenderConfig,
}

impl RenderDispatcher {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, payload: &ReplyPayload) -> RenderInstruction {
        if let Some(attachment) = payload
            .attachment
            .as_ref()
            .filter(|a| !a.image_url.trim().is_empty())
        {
            return self.attached_image(attachment);
        }

        let text = payload.text.as_str();
        if text.contains('|') && text.contains('\n') {
            return RenderInstruction::TableRender {
                blocks: table_blocks(text),
            };
        }

        let markup = markdown::format(text);
        let segments = extract_images_with_alt(&markup, &self.config.inline_image_alt);
        if segments.iter().any(ContentSegment::is_image) {
            RenderInstruction::SegmentedRender { segments }
        } else {
            RenderInstruction::PlainRender { markup }
        }
    }

    fn attached_image(&self, attachment: &ImageAttachment) -> RenderInstruction {
        let title = attachment.label().to_string();
        RenderInstruction::AttachedImage {
            caption: markdown::format(&format!("Here's the {title}")),
            title,
            image_url: attachment.image_url.clone(),
            fallback_url: self.config.fallback_image_url.clone(),
        }
    }
}

/// Blocks for a tabular reply. Blocks that fail to parse, and replies with
/// no table at all, stay raw text.
fn table_blocks(text: &str) -> Vec<TableBlock> {
    extract_tables(text)
        .into_iter()
        .map(|segment| match segment {
            TableSegment::Text(content) => TableBlock::Text { content },
            TableSegment::Table(raw) => match parse_table(&raw) {
                Some(table) => TableBlock::Table(table),
                None => TableBlock::Text { content: raw },
            },
        })
        .collect()
}
