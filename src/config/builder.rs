//! Type-safe builder for `ExportConfig` using the typestate pattern
//!
//! The base URL is the only required value, so `build()` only exists once
//! `base_url()` has been called.

use crate::utils::{
    DEFAULT_CONTENT_ID_DOMAIN, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_FROM, DEFAULT_IMAGE_ALT,
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_FETCH_RETRIES, DEFAULT_MAX_RESOURCE_SIZE,
    DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_TO, DEFAULT_USER_AGENT,
};
use anyhow::{Context, Result, anyhow, bail};
use std::marker::PhantomData;
use url::Url;

use super::types::ExportConfig;

// Type states for the builder
pub struct WithBaseUrl;

pub struct ExportConfigBuilder<State = ()> {
    pub(crate) base_url: Option<String>,
    pub(crate) stylesheet: Option<String>,
    pub(crate) max_concurrent_fetches: usize,
    pub(crate) max_fetch_retries: u32,
    pub(crate) retry_initial_delay_ms: u64,
    pub(crate) retry_max_delay_ms: u64,
    pub(crate) fetch_timeout_secs: u64,
    pub(crate) max_resource_size_bytes: usize,
    pub(crate) user_agent: String,
    pub(crate) content_id_domain: String,
    pub(crate) id_seed: Option<u64>,
    pub(crate) default_image_alt: String,
    pub(crate) remove_email_incompatible: bool,
    pub(crate) scope_credentials_to_origin: bool,
    pub(crate) default_from: String,
    pub(crate) default_to: String,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ExportConfigBuilder<()> {
    fn default() -> Self {
        Self {
            base_url: None,
            stylesheet: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_fetch_retries: DEFAULT_MAX_FETCH_RETRIES,
            retry_initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_resource_size_bytes: DEFAULT_MAX_RESOURCE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            content_id_domain: DEFAULT_CONTENT_ID_DOMAIN.to_string(),
            id_seed: None,
            default_image_alt: DEFAULT_IMAGE_ALT.to_string(),
            remove_email_incompatible: true,
            scope_credentials_to_origin: true,
            default_from: DEFAULT_FROM.to_string(),
            default_to: DEFAULT_TO.to_string(),
            _phantom: PhantomData,
        }
    }
}

impl ExportConfig {
    /// Create a builder for configuring an `ExportConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ExportConfigBuilder<()> {
        ExportConfigBuilder::default()
    }
}

impl ExportConfigBuilder<()> {
    pub fn base_url(self, url: impl Into<String>) -> ExportConfigBuilder<WithBaseUrl> {
        let url_string = url.into().trim().to_string();

        // Normalize URL: add https:// if no scheme is present
        let normalized_url =
            if url_string.starts_with("http://") || url_string.starts_with("https://") {
                url_string
            } else {
                format!("https://{url_string}")
            };

        ExportConfigBuilder {
            base_url: Some(normalized_url),
            stylesheet: self.stylesheet,
            max_concurrent_fetches: self.max_concurrent_fetches,
            max_fetch_retries: self.max_fetch_retries,
            retry_initial_delay_ms: self.retry_initial_delay_ms,
            retry_max_delay_ms: self.retry_max_delay_ms,
            fetch_timeout_secs: self.fetch_timeout_secs,
            max_resource_size_bytes: self.max_resource_size_bytes,
            user_agent: self.user_agent,
            content_id_domain: self.content_id_domain,
            id_seed: self.id_seed,
            default_image_alt: self.default_image_alt,
            remove_email_incompatible: self.remove_email_incompatible,
            scope_credentials_to_origin: self.scope_credentials_to_origin,
            default_from: self.default_from,
            default_to: self.default_to,
            _phantom: PhantomData,
        }
    }
}

/// A domain usable on the right-hand side of a msg-id
fn validate_id_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        bail!("content_id_domain must not be empty");
    }
    if domain
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '@' | '"'))
    {
        bail!("content_id_domain '{domain}' contains characters not allowed in a msg-id");
    }
    Ok(())
}

// Build method only available when the base URL is set
impl ExportConfigBuilder<WithBaseUrl> {
    pub fn build(self) -> Result<ExportConfig> {
        let raw_base = self
            .base_url
            .ok_or_else(|| anyhow!("base_url is required"))?;
        let base_url =
            Url::parse(&raw_base).with_context(|| format!("Invalid base URL '{raw_base}'"))?;
        if base_url.host_str().is_none() {
            bail!("base URL '{raw_base}' has no host");
        }

        if self.max_concurrent_fetches == 0 {
            bail!("max_concurrent_fetches must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be at least 1");
        }
        if self.max_resource_size_bytes == 0 {
            bail!("max_resource_size_bytes must be at least 1");
        }
        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            bail!(
                "retry_max_delay_ms ({}) is smaller than retry_initial_delay_ms ({})",
                self.retry_max_delay_ms,
                self.retry_initial_delay_ms
            );
        }
        validate_id_domain(&self.content_id_domain)?;

        let default_image_alt = if self.default_image_alt.trim().is_empty() {
            log::warn!("Empty default_image_alt replaced with '{DEFAULT_IMAGE_ALT}'");
            DEFAULT_IMAGE_ALT.to_string()
        } else {
            self.default_image_alt
        };

        Ok(ExportConfig {
            base_url,
            stylesheet: self.stylesheet,
            max_concurrent_fetches: self.max_concurrent_fetches,
            max_fetch_retries: self.max_fetch_retries,
            retry_initial_delay_ms: self.retry_initial_delay_ms,
            retry_max_delay_ms: self.retry_max_delay_ms,
            fetch_timeout_secs: self.fetch_timeout_secs,
            max_resource_size_bytes: self.max_resource_size_bytes,
            user_agent: self.user_agent,
            content_id_domain: self.content_id_domain,
            id_seed: self.id_seed,
            default_image_alt,
            remove_email_incompatible: self.remove_email_incompatible,
            scope_credentials_to_origin: self.scope_credentials_to_origin,
            default_from: self.default_from,
            default_to: self.default_to,
        })
    }
}
