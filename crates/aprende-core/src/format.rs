//! Light-markup formatting for assistant replies
//!
//! Replies from the model arrive as loosely markdown-flavoured text. They are
//! parsed once into a [`Reply`], a small block structure that the UIs render
//! themselves. Nothing from the source text is ever passed through as markup:
//! the terminal renderer only produces styled spans and [`Reply::to_html`]
//! only emits a fixed set of tags with every text node escaped.
//!
//! Recognised patterns:
//! - `**text**` becomes strong text (an unmatched `**` stays literal)
//! - `# `, `## `, `### ` at line start become headings
//! - `* ` at line start becomes a bullet item
//! - blank lines separate paragraphs

use std::fmt;

/// An inline run of text inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
}

/// A structural block of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    /// Bullet list, one entry per item
    List(Vec<Vec<Inline>>),
    /// Paragraph, one entry per source line
    Paragraph(Vec<Vec<Inline>>),
}

/// A formatted assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    blocks: Vec<Block>,
}

enum LineKind<'a> {
    Heading(u8, &'a str),
    Bullet(&'a str),
    Text(&'a str),
}

/// Parse raw model output into a [`Reply`].
///
/// Running the result back through the formatter is a no-op:
/// `format_reply(&format_reply(x).to_string()) == format_reply(x)`.
pub fn format_reply(text: &str) -> Reply {
    let cleaned = sanitize(text);
    let mut blocks = Vec::new();
    let mut group: Vec<&str> = Vec::new();

    for line in cleaned.split('\n') {
        if line.trim().is_empty() {
            push_group(&mut blocks, &group);
            group.clear();
        } else {
            group.push(line.trim_end());
        }
    }
    push_group(&mut blocks, &group);

    Reply { blocks }
}

/// Normalise line endings and drop control characters so raw escape
/// sequences from upstream never reach the terminal.
fn sanitize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn classify(line: &str) -> LineKind<'_> {
    for (level, marker) in [(3, "### "), (2, "## "), (1, "# ")] {
        if let Some(rest) = line.strip_prefix(marker) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return LineKind::Heading(level, rest);
            }
        }
    }

    if let Some(rest) = line.strip_prefix("* ") {
        let rest = rest.trim();
        if !rest.is_empty() {
            return LineKind::Bullet(rest);
        }
    }

    LineKind::Text(line)
}

/// Turn one blank-line separated group of lines into blocks
fn push_group(blocks: &mut Vec<Block>, lines: &[&str]) {
    let mut paragraph: Vec<Vec<Inline>> = Vec::new();
    let mut list: Vec<Vec<Inline>> = Vec::new();

    for line in lines {
        match classify(line) {
            LineKind::Heading(level, text) => {
                flush(blocks, &mut paragraph, &mut list);
                blocks.push(Block::Heading {
                    level,
                    content: parse_inline(text),
                });
            }
            LineKind::Bullet(text) => {
                if !paragraph.is_empty() {
                    blocks.push(Block::Paragraph(std::mem::take(&mut paragraph)));
                }
                list.push(parse_inline(text));
            }
            LineKind::Text(text) => {
                if !list.is_empty() {
                    blocks.push(Block::List(std::mem::take(&mut list)));
                }
                paragraph.push(parse_inline(text));
            }
        }
    }

    flush(blocks, &mut paragraph, &mut list);
}

fn flush(blocks: &mut Vec<Block>, paragraph: &mut Vec<Vec<Inline>>, list: &mut Vec<Vec<Inline>>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(paragraph)));
    }
    if !list.is_empty() {
        blocks.push(Block::List(std::mem::take(list)));
    }
}

/// Split a line into plain and strong runs.
///
/// Writing the runs back out reproduces the input exactly.
fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        match after.find("**") {
            Some(close) if close > 0 => {
                plain.push_str(&rest[..open]);
                if !plain.is_empty() {
                    spans.push(Inline::Text(std::mem::take(&mut plain)));
                }
                spans.push(Inline::Strong(after[..close].to_string()));
                rest = &after[close + 2..];
            }
            Some(_) => {
                // "****": the first pair is literal, the second may still open
                plain.push_str(&rest[..open + 2]);
                rest = after;
            }
            None => break,
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Inline::Text(plain));
    }
    spans
}

impl Reply {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render as an HTML fragment.
    ///
    /// Only `p`, `br`, `strong`, `h1`-`h3`, `ul` and `li` are produced; all
    /// text is escaped, so tags in the model output show up as text.
    pub fn to_html(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Heading { level, content } => {
                    format!("<h{level}>{}</h{level}>", inline_html(content))
                }
                Block::List(items) => {
                    let items: String = items
                        .iter()
                        .map(|item| format!("<li>{}</li>", inline_html(item)))
                        .collect();
                    format!("<ul>{items}</ul>")
                }
                Block::Paragraph(lines) => {
                    let lines: Vec<String> = lines.iter().map(|l| inline_html(l)).collect();
                    format!("<p>{}</p>", lines.join("<br>"))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn inline_html(spans: &[Inline]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => escape_text(text),
            Inline::Strong(text) => format!("<strong>{}</strong>", escape_text(text)),
        })
        .collect()
}

/// Escape a text node. `clean_text` also encodes spaces, which is noise
/// inside element content, so those are put back.
fn escape_text(text: &str) -> String {
    ammonia::clean_text(text).replace("&#32;", " ")
}

fn write_inline(f: &mut fmt::Formatter<'_>, spans: &[Inline]) -> fmt::Result {
    for span in spans {
        match span {
            Inline::Text(text) => f.write_str(text)?,
            Inline::Strong(text) => write!(f, "**{text}**")?,
        }
    }
    Ok(())
}

/// Canonical light-markup form of the reply
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            match block {
                Block::Heading { level, content } => {
                    write!(f, "{} ", "#".repeat(*level as usize))?;
                    write_inline(f, content)?;
                }
                Block::List(items) => {
                    for (j, item) in items.iter().enumerate() {
                        if j > 0 {
                            f.write_str("\n")?;
                        }
                        f.write_str("* ")?;
                        write_inline(f, item)?;
                    }
                }
                Block::Paragraph(lines) => {
                    for (j, line) in lines.iter().enumerate() {
                        if j > 0 {
                            f.write_str("\n")?;
                        }
                        write_inline(f, line)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn strong(s: &str) -> Inline {
        Inline::Strong(s.to_string())
    }

    #[test]
    fn test_bold_pair_becomes_strong() {
        let reply = format_reply("**Hi** there");
        assert_eq!(
            reply.blocks(),
            &[Block::Paragraph(vec![vec![strong("Hi"), text(" there")]])]
        );
    }

    #[test]
    fn test_unmatched_marker_stays_literal() {
        let reply = format_reply("2 ** 3 is eight");
        assert_eq!(
            reply.blocks(),
            &[Block::Paragraph(vec![vec![text("2 ** 3 is eight")]])]
        );
    }

    #[test]
    fn test_empty_pair_is_literal() {
        let reply = format_reply("****a**");
        assert_eq!(
            reply.blocks(),
            &[Block::Paragraph(vec![vec![text("**"), strong("a")]])]
        );
    }

    #[test]
    fn test_headings_levels() {
        let reply = format_reply("# One\n## Two\n### Three\n#### Four");
        assert_eq!(
            reply.blocks(),
            &[
                Block::Heading { level: 1, content: vec![text("One")] },
                Block::Heading { level: 2, content: vec![text("Two")] },
                Block::Heading { level: 3, content: vec![text("Three")] },
                Block::Paragraph(vec![vec![text("#### Four")]]),
            ]
        );
    }

    #[test]
    fn test_heading_needs_space_and_content() {
        let reply = format_reply("#hashtag\n# ");
        assert_eq!(
            reply.blocks(),
            &[Block::Paragraph(vec![vec![text("#hashtag")], vec![text("#")]])]
        );
    }

    #[test]
    fn test_bullets_group_into_one_list() {
        let reply = format_reply("Steps:\n* **Read** the chapter\n* Take notes\nThen rest.");
        assert_eq!(
            reply.blocks(),
            &[
                Block::Paragraph(vec![vec![text("Steps:")]]),
                Block::List(vec![
                    vec![strong("Read"), text(" the chapter")],
                    vec![text("Take notes")],
                ]),
                Block::Paragraph(vec![vec![text("Then rest.")]]),
            ]
        );
    }

    #[test]
    fn test_blank_lines_split_paragraphs() {
        let reply = format_reply("First line\nstill first\n\n  \n\nSecond");
        assert_eq!(
            reply.blocks(),
            &[
                Block::Paragraph(vec![vec![text("First line")], vec![text("still first")]]),
                Block::Paragraph(vec![vec![text("Second")]]),
            ]
        );
    }

    #[test]
    fn test_crlf_and_control_characters() {
        let reply = format_reply("one\r\n\r\ntwo \u{1b}[31mred\u{7}");
        assert_eq!(reply.to_string(), "one\n\ntwo [31mred");
    }

    #[test]
    fn test_empty_input() {
        assert!(format_reply("").is_empty());
        assert!(format_reply(" \n\n\t\n").is_empty());
        assert_eq!(format_reply("").to_html(), "");
    }

    #[test]
    fn test_html_uses_fixed_vocabulary() {
        let html = format_reply("# Title\n\n**Hi** there\n* item").to_html();
        assert!(html.starts_with("<h1>Title</h1>"));
        assert!(html.contains("<p><strong>Hi</strong>"));
        assert!(html.contains("<ul><li>item</li></ul>"));
    }

    #[test]
    fn test_html_escapes_source_tags() {
        let html = format_reply("<script>alert(1)</script>\n* <img src=x onerror=alert(1)>").to_html();
        assert!(!html.contains("<script"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_html_keeps_spaces_readable() {
        assert_eq!(format_reply("Hi there").to_html(), "<p>Hi there</p>");
        assert_eq!(
            format_reply("**Hi** there, a < b").to_html(),
            "<p><strong>Hi</strong> there, a &lt; b</p>"
        );
    }

    #[test]
    fn test_html_escapes_inside_strong() {
        let html = format_reply("**<b>bold</b>**").to_html();
        assert!(html.starts_with("<p><strong>&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    const ALLOWED_TAGS: [&str; 8] = ["p", "br", "strong", "h1", "h2", "h3", "ul", "li"];

    fn tag_names(html: &str) -> Vec<String> {
        html.split('<')
            .skip(1)
            .map(|rest| {
                rest.trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect()
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_idempotent_on_markup(input in "[#* a-z<>\n]{0,80}") {
            let once = format_reply(&input);
            let twice = format_reply(&once.to_string());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_idempotent_on_any_string(input in any::<String>()) {
            let once = format_reply(&input);
            prop_assert_eq!(format_reply(&once.to_string()), once);
        }

        #[test]
        fn prop_plain_prose_unchanged(
            lines in prop::collection::vec("[a-zA-Z0-9,.!?][a-zA-Z0-9 ,.!?]{0,30}", 1..5)
        ) {
            let input = lines.join("\n");
            let expected: Vec<&str> = lines.iter().map(|l| l.trim_end()).collect();
            prop_assert_eq!(format_reply(&input).to_string(), expected.join("\n"));
        }

        #[test]
        fn prop_html_only_emits_known_tags(input in "[#* a-z<>/\n]{0,80}") {
            let html = format_reply(&input).to_html();
            for tag in tag_names(&html) {
                prop_assert!(ALLOWED_TAGS.contains(&tag.as_str()), "unexpected tag {:?} in {}", tag, html);
            }
        }
    }
}
