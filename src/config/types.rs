//! Core configuration types for message export
//!
//! This module contains the main `ExportConfig` struct that every pipeline
//! stage reads its limits and defaults from.

use serde::{Deserialize, Serialize};
use url::Url;

/// Main configuration struct for export operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Origin URL of the exported page.
    ///
    /// Relative links and image sources are resolved against it, and
    /// credentials are only attached to fetches on its origin unless
    /// `scope_credentials_to_origin` is disabled.
    pub(crate) base_url: Url,

    /// Style sheet to inline. `None` uses the built-in email style sheet.
    pub(crate) stylesheet: Option<String>,

    /// Fetch attempts allowed in flight at once, shared by image and
    /// attachment downloads of one export
    pub(crate) max_concurrent_fetches: usize,
    pub(crate) max_fetch_retries: u32,
    pub(crate) retry_initial_delay_ms: u64,
    pub(crate) retry_max_delay_ms: u64,

    /// Timeout for a single fetch attempt, including the body transfer
    pub(crate) fetch_timeout_secs: u64,
    pub(crate) max_resource_size_bytes: usize,
    pub(crate) user_agent: String,

    /// Right-hand side of minted Content-ID and Message-ID values
    pub(crate) content_id_domain: String,

    /// Seed for identifier and boundary generation.
    ///
    /// Identical input with an identical seed (and a fixed Date header)
    /// serializes to identical bytes. `None` seeds from the OS.
    pub(crate) id_seed: Option<u64>,

    pub(crate) default_image_alt: String,

    /// Also strip media elements (video, audio, canvas, svg) and document
    /// style sheets that mail clients do not render
    pub(crate) remove_email_incompatible: bool,
    pub(crate) scope_credentials_to_origin: bool,
    pub(crate) default_from: String,
    pub(crate) default_to: String,
}
