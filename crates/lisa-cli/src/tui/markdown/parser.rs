//! Markup parser
//!
//! Reply text arrives with emphasis already converted to `<strong>`/`<em>`.
//! This turns one line of it back into nested [`InlineContent`]. Any other
//! tag, and any closing tag without a matching opener, is kept as text.

use super::elements::InlineContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Strong,
    Em,
}

impl Tag {
    fn wrap(self, content: Vec<InlineContent>) -> InlineContent {
        match self {
            Tag::Strong => InlineContent::Bold(content),
            Tag::Em => InlineContent::Italic(content),
        }
    }
}

const TAGS: [(&str, Tag, bool); 4] = [
    ("<strong>", Tag::Strong, false),
    ("</strong>", Tag::Strong, true),
    ("<em>", Tag::Em, false),
    ("</em>", Tag::Em, true),
];

fn match_tag(input: &str) -> Option<(Tag, bool, usize)> {
    TAGS.iter()
        .find(|(literal, _, _)| input.starts_with(literal))
        .map(|(literal, tag, closing)| (*tag, *closing, literal.len()))
}

/// Parse one line of markup. Unclosed tags style the rest of the line.
pub fn parse_inline(markup: &str) -> Vec<InlineContent> {
    let mut current: Vec<InlineContent> = Vec::new();
    let mut open: Vec<(Tag, Vec<InlineContent>)> = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some((tag, closing, len)) = match_tag(rest) {
                let matches_open = open.last().is_some_and(|(t, _)| *t == tag);
                if !closing || matches_open {
                    flush_text(&mut text, &mut current);
                    if closing {
                        if let Some((tag, parent)) = open.pop() {
                            let inner = std::mem::replace(&mut current, parent);
                            current.push(tag.wrap(inner));
                        }
                    } else {
                        open.push((tag, std::mem::take(&mut current)));
                    }
                    rest = &rest[len..];
                    continue;
                }
            }
        }
        text.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush_text(&mut text, &mut current);
    while let Some((tag, parent)) = open.pop() {
        let inner = std::mem::replace(&mut current, parent);
        if !inner.is_empty() {
            current.push(tag.wrap(inner));
        }
    }
    current
}

fn flush_text(text: &mut String, out: &mut Vec<InlineContent>) {
    if !text.is_empty() {
        out.push(InlineContent::Text(std::mem::take(text)));
    }
}
