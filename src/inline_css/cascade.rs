//! Cascade resolution into `style` attributes

use scraper::ElementRef;

use super::stylesheet::{Declaration, StyleSheet, parse_inline_style};
use crate::document::{Document, NodeId};

/// Sort key of one matched declaration: `!important` first, then
/// specificity, then source order, then position inside its rule
type CascadeKey = (bool, u32, usize, usize);

/// Apply `sheet` to every element outside `<head>`, returning the number
/// of elements whose `style` attribute was rewritten.
pub(super) fn apply(document: &mut Document, sheet: &StyleSheet) -> usize {
    if sheet.is_empty() {
        return 0;
    }

    let updates: Vec<(NodeId, String)> = document
        .elements()
        .into_iter()
        .filter_map(|id| document.element_ref(id))
        .filter(|element| !in_head(element))
        .filter_map(|element| computed_style(sheet, element).map(|style| (element.id(), style)))
        .collect();

    let styled = updates.len();
    for (id, style) in updates {
        document.set_attr(id, "style", &style);
    }
    styled
}

fn in_head(element: &ElementRef<'_>) -> bool {
    element.value().name() == "head"
        || element
            .ancestors()
            .any(|node| node.value().as_element().is_some_and(|e| e.name() == "head"))
}

/// Merged `style` value for one element, or `None` when no rule matches
fn computed_style(sheet: &StyleSheet, element: ElementRef<'_>) -> Option<String> {
    let mut matched: Vec<(CascadeKey, &Declaration)> = Vec::new();
    for rule in sheet.rules() {
        if !rule.selector.matches(&element) {
            continue;
        }
        for (position, declaration) in rule.declarations.iter().enumerate() {
            matched.push((
                (declaration.important, rule.specificity, rule.source_order, position),
                declaration,
            ));
        }
    }
    if matched.is_empty() {
        return None;
    }
    matched.sort_by_key(|(key, _)| *key);

    // Later entries win; a property keeps the slot of its first appearance
    let mut resolved: Vec<&Declaration> = Vec::new();
    for (_, declaration) in matched {
        match resolved
            .iter_mut()
            .find(|d| d.property == declaration.property)
        {
            Some(slot) => *slot = declaration,
            None => resolved.push(declaration),
        }
    }

    let inline = element
        .value()
        .attr("style")
        .map(parse_inline_style)
        .unwrap_or_default();

    let merged: Vec<String> = resolved
        .into_iter()
        .filter(|d| !inline.iter().any(|i| i.property == d.property))
        .map(Declaration::to_css)
        .chain(inline.iter().map(Declaration::to_css))
        .collect();
    Some(merged.join("; "))
}
