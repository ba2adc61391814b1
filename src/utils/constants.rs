//! Shared configuration constants for the exporter
//!
//! Default values used by the config builder and the pipeline stages, kept in
//! one place so the builder defaults and the documentation agree.

/// Maximum accepted HTML input: 10 MiB
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

/// Maximum size of a single fetched resource: 50 MiB
///
/// Applies to both embedded images and attachments. Bodies are streamed and
/// the fetch is aborted as soon as the limit is crossed.
pub const DEFAULT_MAX_RESOURCE_SIZE: usize = 50 * 1024 * 1024;

/// Default number of fetch attempts allowed in flight per export
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Default number of retries after the first failed attempt
pub const DEFAULT_MAX_FETCH_RETRIES: u32 = 3;

/// Initial backoff before the first retry, in milliseconds
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound for a single backoff sleep, in milliseconds
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Per-attempt fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Domain part of minted Content-ID and Message-ID values
pub const DEFAULT_CONTENT_ID_DOMAIN: &str = "confluence-export";

/// Alt text synthesized for images that carry none
pub const DEFAULT_IMAGE_ALT: &str = "Image";

pub const DEFAULT_FROM: &str = "confluence-exporter@localhost";
pub const DEFAULT_TO: &str = "user@localhost";

/// Subject prefix used by [`crate::pipeline::ExportRequest::subject_for_title`]
pub const SUBJECT_PREFIX: &str = "Confluence Export: ";

/// User agent sent with every resource fetch
pub const DEFAULT_USER_AGENT: &str = concat!("kodegen-eml/", env!("CARGO_PKG_VERSION"));

/// Line length for base64 bodies (RFC 2045)
pub const BASE64_LINE_LENGTH: usize = 76;
