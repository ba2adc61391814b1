//! Wire access for the fetcher
//!
//! The retry, concurrency and sniffing policy lives in
//! [`super::ResourceFetcher`]; a [`Transport`] only performs one attempt.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

use crate::config::ExportConfig;
use crate::errors::{ExportError, ExportResult, FetchFailure};

/// Opaque credentials passed through to the transport
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    /// HTTP basic auth, e.g. a wiki user name and API token
    Basic { user: String, token: String },
    /// `Authorization: Bearer` token
    Bearer(String),
}

impl Credentials {
    #[must_use]
    pub fn basic(user: impl Into<String>, token: impl Into<String>) -> Self {
        Credentials::Basic {
            user: user.into(),
            token: token.into(),
        }
    }

    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(token.into())
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Credentials::None)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "Credentials::None"),
            Credentials::Basic { user, .. } => {
                write!(f, "Credentials::Basic {{ user: {user:?}, token: <redacted> }}")
            }
            Credentials::Bearer(_) => write!(f, "Credentials::Bearer(<redacted>)"),
        }
    }
}

/// One attempt to fetch one URL
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a Url,
    /// `None` when credentials must not be sent to this URL
    pub credentials: Option<&'a Credentials>,
    pub max_size: usize,
}

/// Successful response of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// `Content-Type` header as sent by the server
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Type alias for a transport attempt future
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, FetchFailure>> + Send + 'a>>;

/// Performs single fetch attempts.
///
/// Implementations report non-success statuses as `FetchFailure::Status`
/// and must stop reading once the body exceeds `max_size`.
pub trait Transport: Send + Sync + 'static {
    fn get<'a>(&'a self, request: FetchRequest<'a>) -> TransportFuture<'a>;
}

/// reqwest-backed HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a client with the given user agent and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Config` if the TLS backend cannot be initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> ExportResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ExportError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    /// # Errors
    ///
    /// Returns `ExportError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &ExportConfig) -> ExportResult<Self> {
        Self::new(config.user_agent(), config.fetch_timeout())
    }

    async fn get_inner(&self, request: FetchRequest<'_>) -> Result<RawResponse, FetchFailure> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .timeout(self.timeout)
            .header(ACCEPT, "*/*");
        builder = match request.credentials {
            Some(Credentials::Basic { user, token }) => builder.basic_auth(user, Some(token)),
            Some(Credentials::Bearer(token)) => builder.bearer_auth(token),
            Some(Credentials::None) | None => builder,
        };

        let response = builder.send().await.map_err(|e| classify(&e, self.timeout))?;

        // Check status
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Enforce limit BEFORE downloading
        let expected_size = response.content_length().unwrap_or(0);
        if expected_size > request.max_size as u64 {
            return Err(FetchFailure::TooLarge {
                limit: request.max_size,
            });
        }

        let mut buffer = Vec::with_capacity(expected_size as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| classify(&e, self.timeout))?;

            // Check BEFORE accumulating
            if buffer.len() + chunk.len() > request.max_size {
                return Err(FetchFailure::TooLarge {
                    limit: request.max_size,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            content_type,
            body: buffer,
        })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, request: FetchRequest<'a>) -> TransportFuture<'a> {
        Box::pin(self.get_inner(request))
    }
}

/// Map a reqwest error onto the retry taxonomy
fn classify(error: &reqwest::Error, timeout: Duration) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout(timeout)
    } else if error.is_body() || error.is_decode() {
        FetchFailure::Body(error.to_string())
    } else if error.is_builder() {
        FetchFailure::InvalidUrl(error.to_string())
    } else if let Some(status) = error.status() {
        FetchFailure::Status(status.as_u16())
    } else {
        FetchFailure::Connect(error.to_string())
    }
}
