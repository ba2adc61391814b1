//! Bounded-concurrency resource fetching
//!
//! One [`ResourceFetcher`] serves one export. Its semaphore caps how many
//! attempts are in flight across image and attachment downloads, transient
//! failures are retried with exponential backoff, and every payload is typed
//! by signature before the declared header is trusted.

pub mod retry;
pub mod sniff;
pub mod transport;

pub use retry::RetryConfig;
pub use transport::{Credentials, FetchRequest, HttpTransport, RawResponse, Transport, TransportFuture};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use mime::Mime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::{Origin, Url};

use crate::config::ExportConfig;
use crate::errors::{ExportError, ExportResult, FetchFailure};
use crate::utils::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_RESOURCE_SIZE,
};

/// A downloaded payload with everything known about its type
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResource {
    pub url: Url,
    pub bytes: Vec<u8>,
    /// Resolved type: signature, specific header, URL extension, octet-stream
    pub content_type: Mime,
    /// Type recognised from the payload signature
    pub sniffed_type: Option<Mime>,
    /// `Content-Type` header as sent by the server
    pub declared_type: Option<String>,
    pub attempts: u32,
}

impl FetchedResource {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Limits of one fetcher
#[derive(Debug, Clone)]
pub struct FetchLimits {
    pub max_concurrent: usize,
    pub retry: RetryConfig,
    pub timeout: Duration,
    pub max_size: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_size: DEFAULT_MAX_RESOURCE_SIZE,
        }
    }
}

impl FetchLimits {
    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_fetches(),
            retry: config.retry_config(),
            timeout: config.fetch_timeout(),
            max_size: config.max_resource_size_bytes(),
        }
    }
}

pub struct ResourceFetcher<T: Transport = HttpTransport> {
    transport: Arc<T>,
    permits: Arc<Semaphore>,
    limits: FetchLimits,
    /// Credentials are only attached on this origin; `None` attaches everywhere
    credential_origin: Option<Origin>,
}

impl<T: Transport> ResourceFetcher<T> {
    #[must_use]
    pub fn new(transport: Arc<T>, limits: FetchLimits) -> Self {
        let permits = Arc::new(Semaphore::new(limits.max_concurrent.max(1)));
        Self {
            transport,
            permits,
            limits,
            credential_origin: None,
        }
    }

    /// Fetcher for one export, scoped to the configured base URL
    #[must_use]
    pub fn for_export(transport: Arc<T>, config: &ExportConfig) -> Self {
        let fetcher = Self::new(transport, FetchLimits::from_config(config));
        if config.scope_credentials_to_origin() {
            fetcher.scope_credentials_to(config.base_url())
        } else {
            fetcher
        }
    }

    /// Only send credentials to URLs on the origin of `url`
    #[must_use]
    pub fn scope_credentials_to(mut self, url: &Url) -> Self {
        self.credential_origin = Some(url.origin());
        self
    }

    #[must_use]
    pub fn limits(&self) -> &FetchLimits {
        &self.limits
    }

    /// Permits not currently held by an attempt
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn credentials_for<'c>(&self, url: &Url, credentials: &'c Credentials) -> Option<&'c Credentials> {
        if credentials.is_none() {
            return None;
        }
        match &self.credential_origin {
            Some(origin) if *origin != url.origin() => {
                log::debug!("Not sending credentials to foreign origin {}", url.origin().ascii_serialization());
                None
            }
            _ => Some(credentials),
        }
    }

    /// Fetch one URL, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::ResourceFetch` naming the URL, the cause of the
    /// last attempt and the number of attempts made.
    pub async fn fetch(&self, url: &str, credentials: &Credentials) -> ExportResult<FetchedResource> {
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            Ok(parsed) => {
                return Err(fetch_error(
                    url,
                    FetchFailure::InvalidUrl(format!("unsupported scheme '{}'", parsed.scheme())),
                    0,
                ));
            }
            Err(e) => return Err(fetch_error(url, FetchFailure::InvalidUrl(e.to_string()), 0)),
        };
        let credentials = self.credentials_for(&parsed, credentials);
        let retry = &self.limits.retry;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self.attempt(&parsed, credentials).await;

            match outcome {
                Ok(raw) => {
                    let sniffed_type = sniff::sniff(&raw.body);
                    let content_type = sniff::observed_content_type(
                        &raw.body,
                        raw.content_type.as_deref(),
                        parsed.path(),
                    );
                    log::debug!(
                        "Fetched {} ({} bytes, {}) in {} attempt(s)",
                        parsed,
                        raw.body.len(),
                        content_type,
                        attempt
                    );
                    return Ok(FetchedResource {
                        url: parsed,
                        bytes: raw.body,
                        content_type,
                        sniffed_type,
                        declared_type: raw.content_type,
                        attempts: attempt,
                    });
                }
                Err(cause) if cause.is_transient() && attempt <= retry.max_retries => {
                    let delay = retry.delay_for_attempt(attempt - 1);
                    log::warn!(
                        "Attempt {attempt}/{} for {parsed} failed ({cause}), retrying in {delay:?}",
                        retry.max_attempts()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(cause) => {
                    if cause.is_auth_failure() {
                        log::warn!("Access denied for {parsed}: {cause}");
                    } else {
                        log::warn!("Giving up on {parsed} after {attempt} attempt(s): {cause}");
                    }
                    return Err(fetch_error(url, cause, attempt));
                }
            }
        }
    }

    /// One attempt under a permit. The permit is released before any backoff.
    async fn attempt(&self, url: &Url, credentials: Option<&Credentials>) -> Result<RawResponse, FetchFailure> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchFailure::Connect("fetch pool is closed".to_string()))?;

        let request = FetchRequest {
            url,
            credentials,
            max_size: self.limits.max_size,
        };
        let raw = match tokio::time::timeout(self.limits.timeout, self.transport.get(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchFailure::Timeout(self.limits.timeout)),
        };
        if raw.body.len() > self.limits.max_size {
            return Err(FetchFailure::TooLarge {
                limit: self.limits.max_size,
            });
        }
        Ok(raw)
    }

    /// Fetch a batch concurrently, returning results in input order.
    ///
    /// The first terminal failure is returned immediately; the remaining
    /// in-flight fetches are dropped and their bytes discarded.
    ///
    /// # Errors
    ///
    /// Returns the first `ExportError::ResourceFetch` of the batch.
    pub async fn fetch_all(&self, urls: &[String], credentials: &Credentials) -> ExportResult<Vec<FetchedResource>> {
        let mut slots: Vec<Option<FetchedResource>> = (0..urls.len()).map(|_| None).collect();
        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| async move { (index, self.fetch(url, credentials).await) })
            .collect();

        while let Some((index, result)) = pending.next().await {
            match result {
                Ok(resource) => slots[index] = Some(resource),
                Err(e) => {
                    if !pending.is_empty() {
                        log::debug!("Cancelling {} in-flight fetch(es) after failure", pending.len());
                    }
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.ok_or_else(|| ExportError::Invariant(format!("fetch of {url} never completed")))
            })
            .collect()
    }
}

fn fetch_error(url: &str, cause: FetchFailure, attempts: u32) -> ExportError {
    ExportError::ResourceFetch {
        url: url.to_string(),
        cause,
        attempts,
    }
}
