//! HTML sanitization
//!
//! Page HTML comes from an untrusted remote wiki. Everything that can execute
//! code, frame other documents, or submit data is removed unconditionally.
//! Media that mail clients cannot render is removed too unless the policy
//! keeps it. Text and the order of the remaining elements are left alone.

mod policy;

pub use policy::SanitizePolicy;

use scraper::Node;
use scraper::node::Element;

use crate::config::ExportConfig;
use crate::document::{Document, NodeId};
use crate::errors::ExportResult;
use policy::{
    ALT_TEXT_ELEMENTS, EMAIL_INCOMPATIBLE_ELEMENTS, FORBIDDEN_ELEMENTS, URL_ATTRIBUTES,
    has_script_scheme, is_data_url, is_event_handler, is_unsafe_style,
};

#[derive(Debug, Clone, Default)]
pub struct HtmlSanitizer {
    policy: SanitizePolicy,
}

impl HtmlSanitizer {
    #[must_use]
    pub fn new(policy: SanitizePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(SanitizePolicy::from_config(config))
    }

    #[must_use]
    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// Parse and clean `raw_html`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MalformedInput` when the page is over the
    /// size limit.
    pub fn sanitize(&self, raw_html: &str) -> ExportResult<Document> {
        let mut document = Document::parse(raw_html)?;
        self.sanitize_document(&mut document);
        Ok(document)
    }

    /// Clean an already parsed document in place
    pub fn sanitize_document(&self, document: &mut Document) {
        let removed_elements = document.remove_where(|node| self.is_removed(node));

        let mut removed_attributes = 0;
        for id in document.elements() {
            removed_attributes += strip_attributes(document, id);
            let Some(element) = document.element(id) else {
                continue;
            };
            if ALT_TEXT_ELEMENTS.contains(&element.name())
                && element.attr("alt").is_none_or(|alt| alt.trim().is_empty())
            {
                document.set_attr(id, "alt", &self.policy.default_image_alt);
            }
        }

        ensure_utf8_charset(document);

        log::debug!(
            "Sanitized document: removed {removed_elements} element(s) and {removed_attributes} attribute(s)"
        );
    }

    fn is_removed(&self, node: &Node) -> bool {
        match node {
            Node::Element(element) => self.is_removed_element(element),
            // Conditional comments can smuggle markup into old clients
            Node::Comment(comment) => comment.trim_start().starts_with("[if"),
            _ => false,
        }
    }

    fn is_removed_element(&self, element: &Element) -> bool {
        let name = element.name();
        if FORBIDDEN_ELEMENTS.contains(&name) {
            return true;
        }
        if name == "meta"
            && element
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        {
            return true;
        }
        if !self.policy.remove_email_incompatible {
            return false;
        }
        if EMAIL_INCOMPATIBLE_ELEMENTS.contains(&name) {
            return true;
        }
        name == "link"
            && element.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("stylesheet"))
            })
    }
}

/// Drop event handlers, srcset, script and `data:` URLs and stale `cid:`
/// references. `img[src]` may keep a `data:` URL. Returns the number of
/// attributes removed.
fn strip_attributes(document: &mut Document, id: NodeId) -> usize {
    let is_img = document.element(id).is_some_and(|e| e.name() == "img");
    document.remove_attrs_where(id, |name, value| {
        let name = name.to_ascii_lowercase();
        if is_event_handler(&name) || name == "srcset" {
            return true;
        }
        if name == "style" {
            return is_unsafe_style(value);
        }
        if URL_ATTRIBUTES.contains(&name.as_str()) {
            let value = value.trim_start();
            return has_script_scheme(value)
                || value.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("cid:"))
                || (is_data_url(value) && !(is_img && name == "src"));
        }
        false
    })
}

/// Make `<meta charset="utf-8">` the only charset declaration in `<head>`
fn ensure_utf8_charset(document: &mut Document) {
    let Some(head) = document.head() else {
        return;
    };

    document.remove_where(|node| {
        node.as_element().is_some_and(|e| {
            e.name() == "meta"
                && (e.attr("charset").is_some()
                    || e.attr("http-equiv")
                        .is_some_and(|v| v.eq_ignore_ascii_case("content-type")))
        })
    });

    if !document.prepend_markup(head, r#"<meta charset="utf-8">"#, "meta") {
        log::warn!("Could not insert a charset declaration");
    }
}
