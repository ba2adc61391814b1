//! Built-in style sheet for exported messages

/// Email-safe style sheet used when no custom sheet is configured
pub const EMAIL_STYLESHEET: &str = include_str!("email_styles.css");

/// Style sheet text for an export: the configured override or the built-in sheet
#[must_use]
pub fn stylesheet_or_default(custom: Option<&str>) -> &str {
    custom.unwrap_or(EMAIL_STYLESHEET)
}
