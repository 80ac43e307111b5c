//! Inline content rendering to Ratatui Spans

use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

use super::elements::InlineContent;
use crate::tui::theme::Theme;

/// Convert inline content to styled spans
pub fn render_inline(content: &[InlineContent], theme: &Theme) -> Vec<Span<'static>> {
    render_inline_with_style(content, Style::default().fg(theme.text_color))
}

/// Like [`render_inline`], starting from `base_style`
pub fn render_inline_with_style(content: &[InlineContent], base_style: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for item in content {
        render_inline_item(item, base_style, &mut spans);
    }
    spans
}

fn render_inline_item(item: &InlineContent, base_style: Style, spans: &mut Vec<Span<'static>>) {
    match item {
        InlineContent::Text(text) => {
            spans.push(Span::styled(text.clone(), base_style));
        }
        InlineContent::Bold(content) => {
            let style = base_style.add_modifier(Modifier::BOLD);
            for inner in content {
                render_inline_item(inner, style, spans);
            }
        }
        InlineContent::Italic(content) => {
            let style = base_style.add_modifier(Modifier::ITALIC);
            for inner in content {
                render_inline_item(inner, style, spans);
            }
        }
    }
}
