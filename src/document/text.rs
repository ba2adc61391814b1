//! Plain-text rendering for the text/plain alternative

use ego_tree::iter::Edge;
use regex::Regex;
use scraper::Node;
use std::sync::LazyLock;

use super::Document;

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("EXCESS_BLANK_LINES: hardcoded regex is valid")
});

/// Elements that start and end a paragraph
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "dl", "table", "blockquote",
    "pre", "section", "article", "header", "footer", "nav", "aside", "figure", "hr", "address",
];

/// Elements that occupy their own line
const LINE_ELEMENTS: &[&str] = &["li", "tr", "dt", "dd", "caption", "figcaption"];

/// Subtrees with no readable text
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "noscript"];

struct TextBuffer {
    out: String,
}

impl TextBuffer {
    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn push_space(&mut self) {
        if !self.at_line_start() && !self.out.ends_with([' ', '\t']) {
            self.out.push(' ');
        }
    }

    fn push_words(&mut self, text: &str) {
        let mut pending_space = text.starts_with(char::is_whitespace);
        for word in text.split_whitespace() {
            if pending_space {
                self.push_space();
            }
            self.out.push_str(word);
            pending_space = true;
        }
        if text.ends_with(char::is_whitespace) {
            self.push_space();
        }
    }

    fn push_raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn paragraph_break(&mut self) {
        self.line_break();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn hard_break(&mut self) {
        self.trim_trailing_spaces();
        self.out.push('\n');
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
    }

    fn finish(self) -> String {
        EXCESS_BLANK_LINES
            .replace_all(self.out.trim(), "\n\n")
            .into_owned()
    }
}

/// Render the readable text of `document`.
///
/// Block elements become paragraphs, `<br>` a line break, list items get a
/// `- ` marker, and links whose target differs from their text are followed
/// by the target in angle brackets. Whitespace is collapsed except inside
/// `<pre>`.
#[must_use]
pub fn to_plain_text(document: &Document) -> String {
    let tree = &document.html().tree;
    let start = document
        .body()
        .and_then(|id| tree.get(id))
        .unwrap_or_else(|| tree.root());
    let mut buffer = TextBuffer { out: String::new() };
    let mut skip_depth = 0usize;
    let mut pre_depth = 0usize;
    // (link start offset in the output, href)
    let mut links: Vec<(usize, Option<String>)> = Vec::new();

    for edge in start.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => {
                    let name = element.name();
                    if skip_depth > 0 || SKIPPED_ELEMENTS.contains(&name) {
                        skip_depth += 1;
                        continue;
                    }
                    match name {
                        "br" => buffer.hard_break(),
                        "pre" => {
                            buffer.paragraph_break();
                            pre_depth += 1;
                        }
                        "li" => {
                            buffer.line_break();
                            buffer.push_raw("- ");
                        }
                        "td" | "th" => {
                            if !buffer.at_line_start() {
                                buffer.push_raw("\t");
                            }
                        }
                        "a" => links.push((
                            buffer.out.len(),
                            element.attr("href").map(str::to_string),
                        )),
                        _ if BLOCK_ELEMENTS.contains(&name) => buffer.paragraph_break(),
                        _ if LINE_ELEMENTS.contains(&name) => buffer.line_break(),
                        _ => {}
                    }
                }
                Node::Text(text) if skip_depth == 0 => {
                    if pre_depth > 0 {
                        buffer.push_raw(text);
                    } else {
                        buffer.push_words(text);
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                let Node::Element(element) = node.value() else {
                    continue;
                };
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                let name = element.name();
                match name {
                    "pre" => {
                        pre_depth = pre_depth.saturating_sub(1);
                        buffer.paragraph_break();
                    }
                    "a" => {
                        if let Some((offset, Some(href))) = links.pop() {
                            let label = buffer.out.get(offset..).unwrap_or_default().trim().to_string();
                            if is_linkable(&href) && label != href {
                                buffer.push_raw(&format!(" <{href}>"));
                            }
                        }
                    }
                    _ if BLOCK_ELEMENTS.contains(&name) => buffer.paragraph_break(),
                    _ if LINE_ELEMENTS.contains(&name) => buffer.line_break(),
                    _ => {}
                }
            }
        }
    }

    buffer.finish()
}

fn is_linkable(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://") || href.starts_with("mailto:")
}
