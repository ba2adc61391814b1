//! End-to-end export of one wiki page
//!
//! Sanitize → inline styles → (embed images ∥ resolve attachments) →
//! assemble. Each export owns its document, identifier generator and fetch
//! budget; the exporter itself only holds immutable configuration and the
//! shared transport, so one instance can serve concurrent exports.

use std::sync::Arc;

use crate::attachments::{AttachmentManifestEntry, AttachmentResolver, ResolvedAttachment};
use crate::config::ExportConfig;
use crate::document::to_plain_text;
use crate::embedder::{EmbeddedResource, ImageEmbedder};
use crate::errors::ExportResult;
use crate::fetcher::{Credentials, HttpTransport, ResourceFetcher, Transport};
use crate::ids::IdGenerator;
use crate::inline_css::{StyleInliner, stylesheet_or_default};
use crate::message::{MessageAssembler, MessageHeaders};
use crate::sanitizer::HtmlSanitizer;
use crate::utils::SUBJECT_PREFIX;

/// Input of one export
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub html: String,
    pub manifest: Vec<AttachmentManifestEntry>,
    pub headers: MessageHeaders,
    /// Rendered from the final HTML when absent
    pub plain_text: Option<String>,
}

impl ExportRequest {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Subject line for a page title, `Confluence Export: <title>`
    #[must_use]
    pub fn subject_for_title(title: &str) -> String {
        format!("{SUBJECT_PREFIX}{}", title.trim())
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: Vec<AttachmentManifestEntry>) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_plain_text(mut self, plain_text: impl Into<String>) -> Self {
        self.plain_text = Some(plain_text.into());
        self
    }
}

/// Result of one export
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// Complete `.eml` message
    pub bytes: Vec<u8>,
    pub embedded_images: usize,
    pub attachments: usize,
}

pub struct EmlExporter<T: Transport = HttpTransport> {
    config: ExportConfig,
    transport: Arc<T>,
    sanitizer: HtmlSanitizer,
    inliner: StyleInliner,
    assembler: MessageAssembler,
}

impl EmlExporter<HttpTransport> {
    /// Exporter over HTTP with the configured user agent and timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Config` if the HTTP client cannot be built and
    /// `ExportError::StyleParse` if the configured style sheet is malformed.
    pub fn new(config: ExportConfig) -> ExportResult<Self> {
        let transport = Arc::new(HttpTransport::from_config(&config)?);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> EmlExporter<T> {
    /// # Errors
    ///
    /// Returns `ExportError::StyleParse` if the configured style sheet is
    /// malformed.
    pub fn with_transport(config: ExportConfig, transport: Arc<T>) -> ExportResult<Self> {
        let inliner = StyleInliner::from_css(stylesheet_or_default(config.stylesheet()))?;
        if inliner.sheet().skipped() > 0 {
            log::debug!("Style sheet has {} rule(s) that cannot be inlined", inliner.sheet().skipped());
        }
        Ok(Self {
            sanitizer: HtmlSanitizer::from_config(&config),
            assembler: MessageAssembler::from_config(&config),
            inliner,
            transport,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export one page into `.eml` bytes.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; no partial message is produced.
    /// `ExportError::stage()` tells which stage failed.
    pub async fn export(&self, request: ExportRequest, credentials: &Credentials) -> ExportResult<ExportOutput> {
        let base_url = self.config.base_url();
        log::info!("Exporting page from {base_url} ({} bytes of HTML)", request.html.len());

        let mut document = self.sanitizer.sanitize(&request.html)?;
        self.inliner.inline(&mut document, base_url);

        let fetcher = ResourceFetcher::for_export(Arc::clone(&self.transport), &self.config);
        let mut ids = IdGenerator::from_config(&self.config);
        let embedder = ImageEmbedder::new(&fetcher, base_url);
        let resolver = AttachmentResolver::new(&fetcher, base_url);

        let (embedded, attachments): (Vec<EmbeddedResource>, Vec<ResolvedAttachment>) = tokio::try_join!(
            embedder.embed(&mut document, credentials, &mut ids),
            resolver.resolve(&request.manifest, credentials),
        )?;

        let plain_text = request
            .plain_text
            .unwrap_or_else(|| to_plain_text(&document));
        let html = document.to_html();

        let embedded_images = embedded.len();
        let attachment_count = attachments.len();
        let message = self.assembler.assemble(
            &plain_text,
            &html,
            embedded,
            attachments,
            &request.headers,
            &mut ids,
        )?;
        let bytes = message.into_bytes();

        log::info!(
            "Exported {} bytes with {embedded_images} embedded image(s) and {attachment_count} attachment(s)",
            bytes.len()
        );
        Ok(ExportOutput {
            bytes,
            embedded_images,
            attachments: attachment_count,
        })
    }
}
