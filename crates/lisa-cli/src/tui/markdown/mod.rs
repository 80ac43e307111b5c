//! Reply rendering for the terminal
//!
//! Turns a [`RenderInstruction`] into styled lines plus the list of images
//! the user can open by number.

mod elements;
mod inline;
mod parser;
mod table;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use lisa_core::render::{ContentSegment, ImagePopup, RenderInstruction, TableBlock};

use super::theme::Theme;

use parser::parse_inline;

/// A reply laid out for printing
#[derive(Debug, Clone, Default)]
pub struct RenderedReply {
    pub lines: Vec<Line<'static>>,
    /// Openable images, numbered from 1 in the rendered text
    pub images: Vec<ImagePopup>,
    /// Opened instead when an attached image cannot be
    pub fallback: Option<String>,
}

pub fn render_instruction(
    instruction: &RenderInstruction,
    width: usize,
    theme: &Theme,
) -> RenderedReply {
    let mut reply = RenderedReply {
        images: instruction.popups(),
        ..Default::default()
    };
    let link = Style::default()
        .fg(theme.link_color)
        .add_modifier(Modifier::UNDERLINED);

    match instruction {
        RenderInstruction::AttachedImage {
            caption,
            title,
            image_url,
            fallback_url,
        } => {
            reply.lines.extend(markup_lines(caption, theme));
            reply.lines.push(Line::from(vec![
                Span::styled(format!("[1] {title} "), link),
                Span::styled(image_url.clone(), Style::default().fg(theme.dim_color)),
            ]));
            reply.fallback = Some(fallback_url.clone());
        }
        RenderInstruction::TableRender { blocks } => {
            for block in blocks {
                match block {
                    TableBlock::Text { content } => {
                        let content = content.trim_matches('\n');
                        if content.is_empty() {
                            continue;
                        }
                        reply.lines.extend(content.lines().map(|line| {
                            Line::from(Span::styled(
                                line.to_string(),
                                Style::default().fg(theme.text_color),
                            ))
                        }));
                    }
                    TableBlock::Table(table) => {
                        reply.lines.extend(table::render_table(table, width, theme));
                    }
                }
            }
        }
        RenderInstruction::SegmentedRender { segments } => {
            let mut current: Vec<Span<'static>> = Vec::new();
            let mut image_number = 0;
            for segment in segments {
                match segment {
                    ContentSegment::Text { markup } => {
                        let mut pieces = markup.split('\n');
                        if let Some(first) = pieces.next() {
                            current.extend(inline::render_inline(&parse_inline(first), theme));
                        }
                        for piece in pieces {
                            reply.lines.push(Line::from(std::mem::take(&mut current)));
                            current.extend(inline::render_inline(&parse_inline(piece), theme));
                        }
                    }
                    ContentSegment::Image { alt, .. } => {
                        image_number += 1;
                        current.push(Span::styled(format!("[{image_number}] {alt}"), link));
                    }
                }
            }
            if !current.is_empty() {
                reply.lines.push(Line::from(current));
            }
        }
        RenderInstruction::PlainRender { markup } => {
            reply.lines.extend(markup_lines(markup, theme));
        }
    }

    reply
}

fn markup_lines(markup: &str, theme: &Theme) -> Vec<Line<'static>> {
    markup
        .split('\n')
        .map(|line| Line::from(inline::render_inline(&parse_inline(line), theme)))
        .collect()
}
