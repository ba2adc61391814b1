//! URL helpers shared by the inliner, the embedder and the fetcher.

use url::Url;

/// Schemes that are already self-contained or not fetchable and must never be
/// rewritten against a base URL.
const OPAQUE_PREFIXES: &[&str] = &["data:", "cid:", "mailto:", "tel:", "javascript:", "about:"];

/// True when `value` has a scheme that must be left exactly as written
#[must_use]
pub fn is_opaque_reference(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    OPAQUE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Resolve `value` against `base`.
///
/// Returns `None` when the value must stay as is: empty, fragment-only,
/// already absolute, or an opaque scheme such as `data:` or `cid:`.
#[must_use]
pub fn absolutize(base: &Url, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || is_opaque_reference(trimmed) {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return None;
    }
    match base.join(trimmed) {
        Ok(joined) => Some(joined.to_string()),
        Err(e) => {
            log::debug!("Leaving unresolvable URL '{trimmed}' as is: {e}");
            None
        }
    }
}

/// Resolve `value` against `base`, passing absolute URLs through unchanged.
///
/// # Errors
///
/// Returns the parse error when the joined URL is not valid.
pub fn resolve_url(base: &Url, value: &str) -> Result<Url, url::ParseError> {
    let trimmed = value.trim();
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(trimmed),
        Err(e) => Err(e),
    }
}

/// Last non-empty path segment, percent-decoded
#[must_use]
pub fn url_file_name(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())?;
    let decoded = urlencoding::decode(segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://wiki.example/spaces/DOC/page").expect("valid base")
    }

    #[test]
    fn test_absolutize_relative_paths() {
        assert_eq!(
            absolutize(&base(), "/img/a.png").as_deref(),
            Some("https://wiki.example/img/a.png")
        );
        assert_eq!(
            absolutize(&base(), "other").as_deref(),
            Some("https://wiki.example/spaces/DOC/other")
        );
        assert_eq!(
            absolutize(&base(), "//cdn.example/x.css").as_deref(),
            Some("https://cdn.example/x.css")
        );
    }

    #[test]
    fn test_absolutize_leaves_absolute_and_opaque_values() {
        for value in [
            "https://other.example/a",
            "#section",
            "data:image/png;base64,AAAA",
            "cid:abc@x",
            "mailto:a@b.c",
            "",
        ] {
            assert_eq!(absolutize(&base(), value), None, "value {value:?} must be untouched");
        }
    }

    #[test]
    fn test_url_file_name_decodes_last_segment() {
        let url = Url::parse("https://wiki.example/download/My%20File.pdf?version=1")
            .expect("valid url");
        assert_eq!(url_file_name(&url).as_deref(), Some("My File.pdf"));
    }
}
