//! Style sheet parsing
//!
//! A small CSS reader covering what can be expressed as inline styles:
//! qualified rules with declaration blocks. At-rules are recognised and
//! skipped, and so are rules whose selectors need pseudo-classes.

use regex::Regex;
use std::sync::LazyLock;

use scraper::Selector;

use super::selector::{SelectorGroup, parse_selector_list};
use crate::errors::{ExportError, ExportResult};

static IMPORTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*!\s*important\s*$").expect("IMPORTANT: hardcoded regex is valid")
});

/// One `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    /// `property: value`, with the `!important` flag when set
    #[must_use]
    pub fn to_css(&self) -> String {
        if self.important {
            format!("{}: {} !important", self.property, self.value)
        } else {
            format!("{}: {}", self.property, self.value)
        }
    }
}

/// A selector with its declarations.
///
/// Selector groups (`h1, h2 { .. }`) produce one rule per selector, all
/// sharing the group's source order.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub specificity: u32,
    pub declarations: Vec<Declaration>,
    pub source_order: usize,
}

/// Ordered rules of one style sheet
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
    skipped: usize,
}

impl StyleSheet {
    /// Parse style sheet text.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::StyleParse` for unbalanced braces, unterminated
    /// comments or strings, empty or malformed selectors, and declarations
    /// without a property name, colon, or value.
    pub fn parse(css: &str) -> ExportResult<Self> {
        let stripped = strip_comments(css)?;

        let mut sheet = StyleSheet::default();
        let mut scanner = Scanner::new(&stripped);
        let mut order = 0usize;

        loop {
            scanner.skip_whitespace();
            let Some(c) = scanner.peek() else { break };

            if c == '@' {
                let keyword = scanner.at_keyword();
                match scanner.skip_at_rule()? {
                    AtRuleKind::Statement => log::debug!("Skipping @{keyword} statement"),
                    AtRuleKind::Block => {
                        log::debug!("Skipping @{keyword} block (not inlinable)");
                        sheet.skipped += 1;
                    }
                }
                continue;
            }

            let prelude = scanner.read_prelude()?;
            let block = scanner.read_block()?;
            let selector_text = prelude.trim();
            if selector_text.is_empty() {
                return Err(parse_error("rule with empty selector"));
            }

            if block.contains('{') {
                log::debug!("Skipping nested rule block under '{selector_text}'");
                sheet.skipped += 1;
                continue;
            }

            let declarations = parse_declarations(&block)?;
            let selectors = match parse_selector_list(selector_text) {
                Ok(SelectorGroup::Supported(selectors)) => selectors,
                Ok(SelectorGroup::Unsupported(reason)) => {
                    log::debug!("Skipping rule '{selector_text}': {reason}");
                    sheet.skipped += 1;
                    continue;
                }
                Err(message) => {
                    return Err(parse_error(&format!(
                        "invalid selector '{selector_text}': {message}"
                    )));
                }
            };

            for (selector, specificity) in selectors {
                sheet.rules.push(StyleRule {
                    selector,
                    specificity,
                    declarations: declarations.clone(),
                    source_order: order,
                });
            }
            order += 1;
        }

        log::debug!(
            "Parsed style sheet: {} rule(s), {} skipped",
            sheet.rules.len(),
            sheet.skipped
        );
        Ok(sheet)
    }

    #[must_use]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Rules that were recognised but cannot be inlined
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_error(message: &str) -> ExportError {
    ExportError::StyleParse(message.to_string())
}

/// Replace each `/* .. */` outside strings with a space
fn strip_comments(css: &str) -> ExportResult<String> {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(open) => {
                out.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == open || c == '\n' {
                    quote = None;
                }
            }
            None if c == '/' && chars.next_if_eq(&'*').is_some() => {
                let mut previous = '\0';
                loop {
                    match chars.next() {
                        Some('/') if previous == '*' => break,
                        Some(next) => previous = next,
                        None => return Err(parse_error("unterminated comment")),
                    }
                }
                out.push(' ');
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    Ok(out)
}

/// Parse the body of a declaration block.
///
/// # Errors
///
/// Fails on a declaration without colon, property name, or value.
pub fn parse_declarations(block: &str) -> ExportResult<Vec<Declaration>> {
    split_top_level(block, ';')
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            parse_declaration(piece)
                .map_err(|message| parse_error(&format!("{message} in '{piece}'")))
        })
        .collect()
}

/// Parse a `style` attribute, dropping pieces a browser would drop
#[must_use]
pub fn parse_inline_style(style: &str) -> Vec<Declaration> {
    split_top_level(style, ';')
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .filter_map(|piece| parse_declaration(piece).ok())
        .collect()
}

fn parse_declaration(piece: &str) -> Result<Declaration, &'static str> {
    let Some((property, value)) = piece.split_once(':') else {
        return Err("declaration without ':'");
    };
    let property = property.trim();
    if property.is_empty() {
        return Err("declaration without property name");
    }
    if property.chars().any(char::is_whitespace) {
        return Err("property name contains whitespace");
    }

    let (value, important) = match IMPORTANT.find(value) {
        Some(m) => (&value[..m.start()], true),
        None => (value, false),
    };
    let value = value.trim();
    if value.is_empty() {
        return Err("declaration without value");
    }

    let property = if property.starts_with("--") {
        property.to_string()
    } else {
        property.to_ascii_lowercase()
    };

    Ok(Declaration {
        property,
        value: value.to_string(),
        important,
    })
}

/// Split on `separator` outside quotes, parentheses and brackets
pub(super) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('(' | '[', None) => depth += 1,
            (')' | ']', None) => depth = depth.saturating_sub(1),
            (s, None) if s == separator && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

enum AtRuleKind {
    Statement,
    Block,
}

/// Cursor over comment-free style sheet text
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume `@name`, returning the name
    fn at_keyword(&mut self) -> &'a str {
        self.bump();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn skip_string(&mut self, quote: char) -> ExportResult<()> {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' => return Err(parse_error("unterminated string")),
                c if c == quote => return Ok(()),
                _ => {}
            }
        }
        Err(parse_error("unterminated string"))
    }

    /// Skip the rest of an at-rule, either up to `;` or over its `{ .. }` block
    fn skip_at_rule(&mut self) -> ExportResult<AtRuleKind> {
        while let Some(c) = self.bump() {
            match c {
                '"' | '\'' => self.skip_string(c)?,
                ';' => return Ok(AtRuleKind::Statement),
                '{' => {
                    self.pos -= 1;
                    self.read_block()?;
                    return Ok(AtRuleKind::Block);
                }
                '}' => return Err(parse_error("unexpected '}'")),
                _ => {}
            }
        }
        // A trailing statement at-rule may omit the semicolon
        Ok(AtRuleKind::Statement)
    }

    /// Read a selector up to (not including) the opening brace
    fn read_prelude(&mut self) -> ExportResult<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '{' => return Ok(&self.text[start..self.pos]),
                '}' => return Err(parse_error("unexpected '}'")),
                ';' => {
                    return Err(parse_error(&format!(
                        "unexpected ';' after '{}'",
                        self.text[start..self.pos].trim()
                    )));
                }
                '"' | '\'' => {
                    self.bump();
                    self.skip_string(c)?;
                }
                _ => {
                    self.bump();
                }
            }
        }
        Err(parse_error(&format!(
            "expected '{{' after '{}'",
            self.text[start..].trim()
        )))
    }

    /// Read a balanced `{ .. }` block, returning its inner text
    fn read_block(&mut self) -> ExportResult<String> {
        if self.bump() != Some('{') {
            return Err(parse_error("expected '{'"));
        }
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '"' | '\'' => self.skip_string(c)?,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.text[start..self.pos - 1].to_string());
                    }
                }
                _ => {}
            }
        }
        Err(parse_error("unbalanced braces: missing '}'"))
    }
}
