//! Relative URL absolutization

use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

use crate::document::{Document, NodeId};
use crate::utils::absolutize;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(["']?)([^"')]*)(["']?)\s*\)"#)
        .expect("CSS_URL: hardcoded regex is valid")
});

/// (element, attribute) pairs holding a link or resource URL
const URL_BEARING: &[(&str, &str)] = &[
    ("a", "href"),
    ("area", "href"),
    ("link", "href"),
    ("img", "src"),
    ("body", "background"),
    ("table", "background"),
    ("td", "background"),
    ("th", "background"),
];

/// Rewrite relative URLs in link targets, image sources, legacy
/// `background` attributes and `url(..)` values of `style` attributes.
/// Returns the number of rewritten attributes.
pub(super) fn absolutize_urls(document: &mut Document, base_url: &Url) -> usize {
    let mut updates: Vec<(NodeId, &'static str, String)> = Vec::new();
    for id in document.elements() {
        let Some(element) = document.element(id) else {
            continue;
        };

        for &(tag, attr) in URL_BEARING {
            if element.name() != tag {
                continue;
            }
            if let Some(absolute) = element.attr(attr).and_then(|v| absolutize(base_url, v)) {
                log::debug!("Absolutized <{tag} {attr}> to {absolute}");
                updates.push((id, attr, absolute));
            }
        }

        if let Some(style) = element.attr("style") {
            let mut changed = false;
            let updated = CSS_URL.replace_all(style, |caps: &Captures<'_>| {
                match absolutize(base_url, &caps[2]) {
                    Some(absolute) => {
                        changed = true;
                        format!("url({}{absolute}{})", &caps[1], &caps[3])
                    }
                    None => caps[0].to_string(),
                }
            });
            if changed {
                updates.push((id, "style", updated.into_owned()));
            }
        }
    }

    let rewritten = updates.len();
    for (id, attr, value) in updates {
        document.set_attr(id, attr, &value);
    }
    rewritten
}
