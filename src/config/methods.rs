//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use super::builder::ExportConfigBuilder;

impl<State> ExportConfigBuilder<State> {
    /// Replace the built-in email style sheet with custom CSS text
    ///
    /// The text is parsed when the exporter is constructed. Malformed CSS
    /// surfaces there as `ExportError::StyleParse`.
    #[must_use]
    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheet = Some(css.into());
        self
    }

    /// Set the number of fetch attempts allowed in flight per export
    ///
    /// The budget is shared by image and attachment downloads. A value of 0 is
    /// rejected by `build()`.
    ///
    /// # Example
    /// ```rust
    /// # use kodegen_tools_eml::config::ExportConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = ExportConfig::builder()
    ///     .base_url("https://wiki.example/")
    ///     .max_concurrent_fetches(8)
    ///     .build()?;
    /// assert_eq!(config.max_concurrent_fetches(), 8);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    /// Set maximum retries for transient fetch failures
    ///
    /// Set to 0 to disable retries (the first failure becomes permanent).
    #[must_use]
    pub fn max_fetch_retries(mut self, retries: u32) -> Self {
        self.max_fetch_retries = retries;
        self
    }

    /// Set the exponential backoff window in milliseconds
    #[must_use]
    pub fn retry_delays_ms(mut self, initial: u64, max: u64) -> Self {
        self.retry_initial_delay_ms = initial;
        self.retry_max_delay_ms = max;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_resource_size_bytes(mut self, bytes: usize) -> Self {
        self.max_resource_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the domain used for minted Content-ID and Message-ID values
    #[must_use]
    pub fn content_id_domain(mut self, domain: impl Into<String>) -> Self {
        self.content_id_domain = domain.into();
        self
    }

    /// Seed identifier generation for byte-reproducible output
    #[must_use]
    pub fn id_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn default_image_alt(mut self, alt: impl Into<String>) -> Self {
        self.default_image_alt = alt.into();
        self
    }

    /// Keep or strip video, audio, canvas and svg elements and document style sheets
    #[must_use]
    pub fn remove_email_incompatible(mut self, remove: bool) -> Self {
        self.remove_email_incompatible = remove;
        self
    }

    /// Attach credentials to every fetch instead of only base-origin fetches
    ///
    /// Disabling this sends the wiki token to any host referenced by the page.
    #[must_use]
    pub fn scope_credentials_to_origin(mut self, scoped: bool) -> Self {
        self.scope_credentials_to_origin = scoped;
        self
    }

    #[must_use]
    pub fn default_from(mut self, from: impl Into<String>) -> Self {
        self.default_from = from.into();
        self
    }

    #[must_use]
    pub fn default_to(mut self, to: impl Into<String>) -> Self {
        self.default_to = to.into();
        self
    }
}
