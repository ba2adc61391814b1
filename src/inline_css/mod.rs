//! Style inlining
//!
//! Mail clients drop `<style>` blocks and linked sheets, so every rule of the
//! export style sheet is resolved against the document and written into the
//! `style` attribute of each matching element. Relative URLs are made
//! absolute against the page's base URL in the same pass.

// Sub-modules
mod cascade;
pub mod default_styles;
mod selector;
pub mod stylesheet;
mod urls;

// Re-exports for public API
pub use default_styles::{EMAIL_STYLESHEET, stylesheet_or_default};
pub use stylesheet::{Declaration, StyleRule, StyleSheet};

use url::Url;

use crate::document::Document;
use crate::errors::ExportResult;

/// Applies one parsed style sheet to documents
#[derive(Debug, Clone)]
pub struct StyleInliner {
    sheet: StyleSheet,
}

impl StyleInliner {
    #[must_use]
    pub fn new(sheet: StyleSheet) -> Self {
        Self { sheet }
    }

    /// Parse `css` once for reuse across documents.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::StyleParse` if the sheet is not well-formed.
    pub fn from_css(css: &str) -> ExportResult<Self> {
        Ok(Self::new(StyleSheet::parse(css)?))
    }

    #[must_use]
    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    /// Inline styles into `document` and absolutize its relative URLs
    pub fn inline(&self, document: &mut Document, base_url: &Url) {
        let styled = cascade::apply(document, &self.sheet);
        let absolutized = urls::absolutize_urls(document, base_url);
        log::debug!(
            "Inlined styles into {styled} element(s), absolutized {absolutized} URL(s), skipped {} rule(s)",
            self.sheet.skipped()
        );
    }
}

/// Parse `stylesheet_text` and inline it into `document`.
///
/// # Errors
///
/// Returns `ExportError::StyleParse` if the sheet is not well-formed. A rule
/// that matches nothing is never an error.
pub fn inline(
    document: &mut Document,
    stylesheet_text: &str,
    base_url: &Url,
) -> ExportResult<()> {
    StyleInliner::from_css(stylesheet_text)?.inline(document, base_url);
    Ok(())
}
