//! Pipe table detection and parsing
//!
//! A table block is a header row, a separator row of dashes/colons, and at
//! least one data row, each line starting and ending with `|`. Rows that
//! follow directly are part of the same block.

use once_cell::sync::Lazy;
use regex::Regex;

use super::elements::{ParsedTable, TableSegment};

static TABLE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*\|.*\|.*\n[ \t]*\|[ \t:|\-]*\|[ \t:|\-]*\n[ \t]*\|.*\|.*(?:\n[ \t]*\|.*\|.*)*",
    )
    .unwrap()
});

/// Split `content` into text and raw table blocks, in order.
///
/// Concatenating the segments gives back `content` exactly.
pub fn extract_tables(content: &str) -> Vec<TableSegment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for found in TABLE_BLOCK_REGEX.find_iter(content) {
        if found.start() > last_end {
            segments.push(TableSegment::Text(
                content[last_end..found.start()].to_string(),
            ));
        }
        segments.push(TableSegment::Table(found.as_str().to_string()));
        last_end = found.end();
    }

    if last_end < content.len() {
        segments.push(TableSegment::Text(content[last_end..].to_string()));
    }

    segments
}

/// Parse a raw table block. `None` when it has fewer than three lines or the
/// second line is not a separator.
pub fn parse_table(block: &str) -> Option<ParsedTable> {
    let lines: Vec<&str> = block.trim().lines().collect();
    if lines.len() < 3 {
        return None;
    }

    let separator = lines[1].trim();
    if !separator.contains('|') || !separator.contains('-') {
        return None;
    }

    let header = split_row(lines[0]);
    let rows = lines[2..]
        .iter()
        .map(|line| split_row(line))
        .filter(|cells| !cells.is_empty())
        .collect();

    Some(ParsedTable { header, rows })
}

/// Cells of one row, trimmed, minus the empty edges outside the outer pipes
fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line
        .trim()
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect();
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTS: &str = "| Part | Qty |\n|------|-----|\n| Valve | 2 |\n| Hose | 4 |";

    #[test]
    fn test_parse_basic_table() {
        let table = parse_table("|A|B|\n|-|-|\n|1|2|").unwrap();
        assert_eq!(table.header, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_trims_cells_and_keeps_all_rows() {
        let table = parse_table(PARTS).unwrap();
        assert_eq!(table.header, vec!["Part", "Qty"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Hose", "4"]);
    }

    #[test]
    fn test_parse_rejects_short_or_unseparated_blocks() {
        assert!(parse_table("|A|B|\n|-|-|").is_none());
        assert!(parse_table("|A|B|\n|x|y|\n|1|2|").is_none());
    }

    #[test]
    fn test_parse_keeps_ragged_rows() {
        let table = parse_table("|A|B|\n|:-|-:|\n|1|\n|1|2|3|").unwrap();
        assert_eq!(table.rows[0], vec!["1"]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_extract_splits_text_around_tables() {
        let content = format!("Here are the parts:\n{PARTS}\nThat's all.");
        let segments = extract_tables(&content);
        assert_eq!(
            segments,
            vec![
                TableSegment::Text("Here are the parts:\n".into()),
                TableSegment::Table(PARTS.into()),
                TableSegment::Text("\nThat's all.".into()),
            ]
        );
    }

    #[test]
    fn test_extract_preserves_content() {
        let content = format!("intro\n{PARTS}\n\nmiddle\n{PARTS}");
        let rebuilt: String = extract_tables(&content)
            .into_iter()
            .map(|segment| match segment {
                TableSegment::Text(s) | TableSegment::Table(s) => s,
            })
            .collect();
        assert_eq!(rebuilt, content);
        assert_eq!(
            extract_tables(&content)
                .iter()
                .filter(|s| matches!(s, TableSegment::Table(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_extract_without_table_is_single_text() {
        let segments = extract_tables("a | b\nno table here");
        assert_eq!(
            segments,
            vec![TableSegment::Text("a | b\nno table here".into())]
        );
    }
}
