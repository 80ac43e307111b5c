//! Table layout
//!
//! Columns are sized to their widest cell. When the table is wider than the
//! terminal, every column is capped to an equal share and long cells are
//! cut with an ellipsis.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use lisa_core::render::ParsedTable;

use crate::tui::theme::Theme;

const MIN_COLUMN_WIDTH: usize = 3;

pub fn render_table(table: &ParsedTable, max_width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let columns = table.column_count();
    if columns == 0 {
        return Vec::new();
    }

    let widths = column_widths(table, columns, max_width);
    let border = Style::default().fg(theme.border_color);
    let header_style = Style::default()
        .fg(theme.title_color)
        .add_modifier(Modifier::BOLD);
    let cell_style = Style::default().fg(theme.text_color);

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    lines.push(row_line(&table.header, &widths, header_style, border));

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    lines.push(Line::from(Span::styled(rule.join("┼"), border)));

    for row in &table.rows {
        lines.push(row_line(row, &widths, cell_style, border));
    }
    lines
}

fn column_widths(table: &ParsedTable, columns: usize, max_width: usize) -> Vec<usize> {
    let mut widths = vec![0; columns];
    for row in std::iter::once(&table.header).chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    // Each column carries two padding spaces and one separator
    let total: usize = widths.iter().map(|w| w + 3).sum();
    if total > max_width {
        let share = (max_width / columns).saturating_sub(3).max(MIN_COLUMN_WIDTH);
        for width in &mut widths {
            *width = (*width).min(share);
        }
    }
    widths
}

fn row_line(cells: &[String], widths: &[usize], style: Style, border: Style) -> Line<'static> {
    let mut spans = Vec::with_capacity(widths.len() * 2);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("│", border));
        }
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        spans.push(Span::styled(format!(" {} ", fit(cell, *width)), style));
    }
    Line::from(spans)
}

/// Pad or cut `text` to exactly `width` display columns
fn fit(text: &str, width: usize) -> String {
    let text_width = UnicodeWidthStr::width(text);
    if text_width <= width {
        return format!("{text}{}", " ".repeat(width - text_width));
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn parts() -> ParsedTable {
        ParsedTable {
            header: vec!["Part".into(), "Qty".into()],
            rows: vec![
                vec!["Angle cock".into(), "2".into()],
                vec!["Hose".into()],
            ],
        }
    }

    #[test]
    fn test_columns_align() {
        let lines = render_table(&parts(), 80, &Theme::default());
        assert_eq!(lines.len(), 4);
        assert_eq!(plain(&lines[0]), " Part       │ Qty ");
        assert_eq!(plain(&lines[1]), "────────────┼─────");
        assert_eq!(plain(&lines[2]), " Angle cock │ 2   ");
        assert_eq!(plain(&lines[3]), " Hose       │     ");
    }

    #[test]
    fn test_narrow_terminal_truncates() {
        let lines = render_table(&parts(), 14, &Theme::default());
        let row = plain(&lines[2]);
        assert!(row.contains('…'));
        assert_eq!(UnicodeWidthStr::width(row.as_str()), UnicodeWidthStr::width(plain(&lines[0]).as_str()));
    }

    #[test]
    fn test_fit_pads_and_cuts() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("abcdef", 4), "abc…");
    }
}
