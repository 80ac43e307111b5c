//! Terminal output
//!
//! Replies are laid out as ratatui [`Line`]s and written straight to the
//! terminal with crossterm, so they stay in the scrollback.

pub mod markdown;
pub mod theme;

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor,
};
use ratatui::style::{Color, Modifier};
use ratatui::text::Line;

/// Write styled lines, one terminal line each
pub fn print_lines(out: &mut impl Write, lines: &[Line<'_>]) -> io::Result<()> {
    for line in lines {
        queue_spans(out, line)?;
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

/// Write one styled line without ending it
pub fn print_inline(out: &mut impl Write, line: &Line<'_>) -> io::Result<()> {
    queue_spans(out, line)?;
    out.flush()
}

fn queue_spans(out: &mut impl Write, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        if let Some(fg) = span.style.fg {
            queue!(out, SetForegroundColor(term_color(fg)))?;
        }
        let modifiers = span.style.add_modifier;
        if modifiers.contains(Modifier::BOLD) {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        if modifiers.contains(Modifier::ITALIC) {
            queue!(out, SetAttribute(Attribute::Italic))?;
        }
        if modifiers.contains(Modifier::UNDERLINED) {
            queue!(out, SetAttribute(Attribute::Underlined))?;
        }
        queue!(
            out,
            Print(span.content.as_ref()),
            SetAttribute(Attribute::Reset),
            ResetColor
        )?;
    }
    Ok(())
}

fn term_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;
    use ratatui::text::Span;

    #[test]
    fn test_print_emits_text_and_newlines() {
        let lines = vec![
            Line::from(Span::styled(
                "bold",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("plain"),
        ];
        let mut out = Vec::new();
        print_lines(&mut out, &lines).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("bold"));
        assert!(text.contains("plain"));
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 2);
    }

    #[test]
    fn test_print_inline_has_no_newline() {
        let mut out = Vec::new();
        print_inline(&mut out, &Line::from("you › ")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("you › "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_rgb_color_maps_through() {
        assert_eq!(
            term_color(Color::Rgb(1, 2, 3)),
            TermColor::Rgb { r: 1, g: 2, b: 3 }
        );
        assert_eq!(term_color(Color::Indexed(42)), TermColor::AnsiValue(42));
    }
}
