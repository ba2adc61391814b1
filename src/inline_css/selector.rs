//! Selector lists of style rules
//!
//! Parsing and matching are done by [`scraper::Selector`]. This module only
//! splits a group into its selectors, sets aside the ones that depend on
//! element state, and ranks the rest by specificity.

use scraper::Selector;

use super::stylesheet::split_top_level;

/// Outcome of reading one rule's selector list
#[derive(Debug)]
pub enum SelectorGroup {
    /// Every selector can be matched statically, paired with its specificity
    Supported(Vec<(Selector, u32)>),
    /// Well-formed, but at least one selector needs a pseudo-class or
    /// pseudo-element
    Unsupported(String),
}

/// Parse a comma-separated selector list.
///
/// # Errors
///
/// Returns a message for an empty selector in the list or a selector the
/// CSS parser rejects, unbalanced brackets and quotes included.
pub fn parse_selector_list(text: &str) -> Result<SelectorGroup, String> {
    let parts: Vec<&str> = split_top_level(text, ',').into_iter().map(str::trim).collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err("empty selector in list".to_string());
    }
    if let Some(part) = parts.iter().find(|part| has_pseudo(part)) {
        return Ok(SelectorGroup::Unsupported(format!(
            "'{part}' needs a pseudo-class or pseudo-element"
        )));
    }

    parts
        .into_iter()
        .map(|part| {
            let selector = Selector::parse(part).map_err(|e| format!("'{part}': {e:?}"))?;
            Ok((selector, specificity(part)))
        })
        .collect::<Result<Vec<_>, String>>()
        .map(SelectorGroup::Supported)
}

/// True when `selector` has a `:` outside quotes and attribute brackets
fn has_pseudo(selector: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in selector.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('[', None) => depth += 1,
            (']', None) => depth = depth.saturating_sub(1),
            (':', None) if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Specificity of one selector without pseudo-classes, packed as
/// `ids << 20 | classes and attributes << 10 | types`
fn specificity(selector: &str) -> u32 {
    let (mut ids, mut classes, mut types) = (0u32, 0u32, 0u32);
    let mut chars = selector.chars().peekable();
    let mut compound_start = true;

    while let Some(c) = chars.next() {
        match c {
            '#' | '.' => {
                if c == '#' {
                    ids += 1;
                } else {
                    classes += 1;
                }
                while chars.next_if(|&n| is_name_char(n)).is_some() {}
                compound_start = false;
            }
            '[' => {
                classes += 1;
                let mut quote: Option<char> = None;
                for n in chars.by_ref() {
                    match (n, quote) {
                        (q, Some(open)) if q == open => quote = None,
                        (_, Some(_)) => {}
                        ('"' | '\'', None) => quote = Some(n),
                        (']', None) => break,
                        _ => {}
                    }
                }
                compound_start = false;
            }
            '>' | '+' | '~' => compound_start = true,
            c if c.is_whitespace() => compound_start = true,
            '*' => compound_start = false,
            c if compound_start && is_name_char(c) => {
                types += 1;
                while chars.next_if(|&n| is_name_char(n)).is_some() {}
                compound_start = false;
            }
            _ => {}
        }
    }
    (ids.min(1023) << 20) | (classes.min(1023) << 10) | types.min(1023)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}
