//! Reply rendering
//!
//! Pure functions from a reply payload to a [`RenderInstruction`]. Nothing
//! here touches the network or a terminal; front ends draw the instruction.

mod dispatch;
mod elements;
mod images;
mod markdown;
mod table;

pub use dispatch::{RenderConfig, RenderDispatcher, DEFAULT_FALLBACK_IMAGE};
pub use elements::{
    ContentSegment, ImagePopup, ParsedTable, RenderInstruction, TableBlock, TableSegment,
    INLINE_IMAGE_TITLE,
};
pub use images::{extract_images, extract_images_with_alt, INLINE_IMAGE_ALT};
pub use markdown::format;
pub use table::{extract_tables, parse_table};
