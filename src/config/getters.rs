//! Getter methods for `ExportConfig`

use std::time::Duration;
use url::Url;

use super::types::ExportConfig;
use crate::fetcher::RetryConfig;

impl ExportConfig {
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn stylesheet(&self) -> Option<&str> {
        self.stylesheet.as_deref()
    }

    #[must_use]
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    #[must_use]
    pub fn max_fetch_retries(&self) -> u32 {
        self.max_fetch_retries
    }

    /// Backoff policy derived from the retry settings
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_fetch_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn max_resource_size_bytes(&self) -> usize {
        self.max_resource_size_bytes
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn content_id_domain(&self) -> &str {
        &self.content_id_domain
    }

    #[must_use]
    pub fn id_seed(&self) -> Option<u64> {
        self.id_seed
    }

    #[must_use]
    pub fn default_image_alt(&self) -> &str {
        &self.default_image_alt
    }

    #[must_use]
    pub fn remove_email_incompatible(&self) -> bool {
        self.remove_email_incompatible
    }

    #[must_use]
    pub fn scope_credentials_to_origin(&self) -> bool {
        self.scope_credentials_to_origin
    }

    #[must_use]
    pub fn default_from(&self) -> &str {
        &self.default_from
    }

    #[must_use]
    pub fn default_to(&self) -> &str {
        &self.default_to
    }
}
