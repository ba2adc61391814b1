//! Error types for the export pipeline
//!
//! Every stage fails fast with one variant of [`ExportError`]. Fetch failures
//! carry a [`FetchFailure`] describing the last attempt so callers can tell
//! permission problems from connectivity problems.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Pipeline stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Configure,
    Sanitize,
    Inline,
    Fetch,
    Assemble,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStage::Configure => write!(f, "configure"),
            ExportStage::Sanitize => write!(f, "sanitize"),
            ExportStage::Inline => write!(f, "inline"),
            ExportStage::Fetch => write!(f, "fetch"),
            ExportStage::Assemble => write!(f, "assemble"),
        }
    }
}

/// Cause of a failed fetch attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    /// Attempt exceeded the per-attempt timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was reset
    #[error("connection failed: {0}")]
    Connect(String),

    /// Server answered with a non-success status
    #[error("server responded with HTTP {0}")]
    Status(u16),

    /// Body stream broke off mid-transfer
    #[error("failed to read response body: {0}")]
    Body(String),

    /// URL is not an absolute http(s) URL
    #[error("invalid resource URL: {0}")]
    InvalidUrl(String),

    /// Body exceeded the configured size limit
    #[error("resource exceeds the {limit} byte size limit")]
    TooLarge { limit: usize },

    /// Payload is not what the caller asked for (e.g. an HTML login page instead of an image)
    #[error("unexpected content: {0}")]
    UnexpectedContent(String),
}

impl FetchFailure {
    /// Check if the failure is transient and the attempt should be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout(_) | FetchFailure::Connect(_) | FetchFailure::Body(_) => true,
            FetchFailure::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            FetchFailure::InvalidUrl(_)
            | FetchFailure::TooLarge { .. }
            | FetchFailure::UnexpectedContent(_) => false,
        }
    }

    /// Authentication or permission failure
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FetchFailure::Status(401 | 403))
    }
}

/// Error types for export operations
#[derive(Debug, Error)]
pub enum ExportError {
    /// Input could not be parsed as markup at all
    #[error("malformed input document: {0}")]
    MalformedInput(String),

    /// Style sheet text is not well-formed
    #[error("style sheet parse error: {0}")]
    StyleParse(String),

    /// A resource could not be fetched, after retries where applicable
    #[error("failed to fetch {url} after {attempts} attempt(s): {cause}")]
    ResourceFetch {
        url: String,
        cause: FetchFailure,
        attempts: u32,
    },

    /// Internal consistency check failed while assembling the message
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// Configuration rejected by the builder
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<url::ParseError> for ExportError {
    fn from(error: url::ParseError) -> Self {
        ExportError::Config(error.to_string())
    }
}

impl From<anyhow::Error> for ExportError {
    fn from(error: anyhow::Error) -> Self {
        ExportError::Config(format!("{error:#}"))
    }
}

impl ExportError {
    /// Stage the error originated from
    #[must_use]
    pub fn stage(&self) -> ExportStage {
        match self {
            ExportError::MalformedInput(_) => ExportStage::Sanitize,
            ExportError::StyleParse(_) => ExportStage::Inline,
            ExportError::ResourceFetch { .. } => ExportStage::Fetch,
            ExportError::Invariant(_) => ExportStage::Assemble,
            ExportError::Config(_) => ExportStage::Configure,
        }
    }

    /// Programming-error class failure, never caused by input or network
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, ExportError::Invariant(_))
    }

    /// URL of the resource that failed, if any
    #[must_use]
    pub fn failed_url(&self) -> Option<&str> {
        match self {
            ExportError::ResourceFetch { url, .. } => Some(url),
            _ => None,
        }
    }
}
