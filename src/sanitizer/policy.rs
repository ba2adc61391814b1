//! Element and attribute rules for the sanitizer

use crate::config::ExportConfig;
use crate::utils::DEFAULT_IMAGE_ALT;

/// Elements that execute code, embed other documents, or submit data
pub(super) const FORBIDDEN_ELEMENTS: &[&str] = &[
    "script", "noscript", "iframe", "frame", "frameset", "object", "embed", "applet", "base",
    "form", "input", "button", "select", "textarea", "portal",
];

/// Elements mail clients do not render, plus document-level style sheets
/// that are replaced by the inlined sheet
pub(super) const EMAIL_INCOMPATIBLE_ELEMENTS: &[&str] =
    &["video", "audio", "canvas", "svg", "math", "style"];

/// Elements that must carry alt text
pub(super) const ALT_TEXT_ELEMENTS: &[&str] = &["img", "area"];

/// Attributes holding a URL
pub(super) const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "action",
    "formaction",
    "background",
    "poster",
    "lowsrc",
    "dynsrc",
    "data",
    "xlink:href",
];

pub(super) fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on")
}

/// Scheme check that ignores the whitespace and control characters
/// browsers skip while parsing a URL
pub(super) fn has_script_scheme(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

/// `data:` URLs are only kept as image sources
pub(super) fn is_data_url(value: &str) -> bool {
    value
        .trim_start()
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

pub(super) fn is_unsafe_style(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("expression(") || lower.contains("javascript:") || lower.contains("-moz-binding")
}

/// Sanitizer knobs taken from [`ExportConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    pub remove_email_incompatible: bool,
    pub default_image_alt: String,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            remove_email_incompatible: true,
            default_image_alt: DEFAULT_IMAGE_ALT.to_string(),
        }
    }
}

impl SanitizePolicy {
    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            remove_email_incompatible: config.remove_email_incompatible(),
            default_image_alt: config.default_image_alt().to_string(),
        }
    }
}
