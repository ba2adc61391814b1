//! Content type detection from payload bytes, headers and URLs

use mime::Mime;

/// Leading bytes inspected for markup signatures
const MARKUP_SNIFF_WINDOW: usize = 1024;

/// Types that say nothing about the payload
const GENERIC_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/unknown",
    "application/binary",
    "application/x-download",
    "application/force-download",
    "application/download",
];

/// Recognise the payload from its signature.
///
/// Archive containers (zip, gzip) are not reported. Office documents are
/// zip files and take their type from the file name.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<Mime> {
    let essence = sniff_essence(bytes)?;
    essence.parse().ok()
}

fn sniff_essence(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 14 && bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("image/x-icon");
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return Some("image/tiff");
    }
    if bytes.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    sniff_markup(bytes)
}

fn sniff_markup(bytes: &[u8]) -> Option<&'static str> {
    let window = &bytes[..bytes.len().min(MARKUP_SNIFF_WINDOW)];
    let window = window.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(window);
    let text = String::from_utf8_lossy(window).to_ascii_lowercase();
    let text = text.trim_start();

    if text.starts_with("<svg") {
        return Some("image/svg+xml");
    }
    if text.starts_with("<?xml") {
        return text.contains("<svg").then_some("image/svg+xml");
    }
    let html_starts = ["<!doctype html", "<html", "<head", "<body"];
    if html_starts.iter().any(|prefix| text.starts_with(prefix)) {
        return Some("text/html");
    }
    None
}

/// True for `application/octet-stream` and similar catch-all types
#[must_use]
pub fn is_generic(essence: &str) -> bool {
    let essence = essence.trim().to_ascii_lowercase();
    essence.is_empty() || essence == "*/*" || GENERIC_TYPES.contains(&essence.as_str())
}

/// Parse a declared type, discarding catch-all types
#[must_use]
pub fn parse_declared(declared: &str) -> Option<Mime> {
    let mime: Mime = declared.trim().parse().ok()?;
    (!is_generic(mime.essence_str())).then_some(mime)
}

/// Guess from a file name or URL path extension
#[must_use]
pub fn guess_from_path(path: &str) -> Option<Mime> {
    mime_guess::from_path(path).first()
}

/// Type of a fetched payload: signature, then a specific declared type,
/// then the URL path extension, then `application/octet-stream`
#[must_use]
pub fn observed_content_type(bytes: &[u8], declared: Option<&str>, url_path: &str) -> Mime {
    sniff(bytes)
        .or_else(|| declared.and_then(parse_declared))
        .or_else(|| guess_from_path(url_path))
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
