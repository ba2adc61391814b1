pub mod attachments;
pub mod config;
pub mod document;
pub mod embedder;
pub mod errors;
pub mod fetcher;
pub mod ids;
pub mod inline_css;
pub mod message;
pub mod pipeline;
pub mod sanitizer;
pub mod utils;

pub use attachments::{AttachmentManifestEntry, AttachmentResolver, ResolvedAttachment, parse_manifest};
pub use config::ExportConfig;
pub use document::{Document, to_plain_text};
pub use embedder::{EmbeddedResource, ImageEmbedder};
pub use errors::{ExportError, ExportResult, ExportStage, FetchFailure};
pub use fetcher::{Credentials, FetchedResource, HttpTransport, ResourceFetcher, Transport};
pub use ids::{ContentId, IdGenerator};
pub use inline_css::{StyleInliner, StyleSheet};
pub use message::{AssembledMessage, MessageAssembler, MessageHeaders};
pub use pipeline::{EmlExporter, ExportOutput, ExportRequest};
pub use sanitizer::{HtmlSanitizer, SanitizePolicy};

/// Export one page over HTTP with `config`.
///
/// # Errors
///
/// Returns the first error of any export stage.
pub async fn export(
    config: ExportConfig,
    request: ExportRequest,
    credentials: &Credentials,
) -> ExportResult<Vec<u8>> {
    let exporter = EmlExporter::new(config)?;
    Ok(exporter.export(request, credentials).await?.bytes)
}
