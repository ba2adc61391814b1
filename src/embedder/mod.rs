//! Image discovery and Content-ID embedding
//!
//! Every `<img>` source is downloaded once per distinct URL, given a
//! Content-ID, and rewritten to `cid:` so the message renders offline.
//! Fetching is the only concurrent phase; discovery, identifier minting and
//! rewriting run in document order so seeded exports are reproducible.

use mime::Mime;
use std::collections::HashMap;
use url::Url;

use crate::document::{Document, NodeId};
use crate::errors::{ExportError, ExportResult, FetchFailure};
use crate::fetcher::{Credentials, FetchedResource, ResourceFetcher, Transport, sniff};
use crate::ids::{ContentId, IdGenerator};
use crate::utils::{resolve_url, url_file_name};

/// One `<img>` node and its resolved source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub node: NodeId,
    pub url: String,
}

/// An image carried inside the message
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedResource {
    pub content_id: ContentId,
    pub bytes: Vec<u8>,
    pub mime: Mime,
    pub filename: Option<String>,
    pub source_url: String,
}

impl EmbeddedResource {
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Collect image references in pre-order.
///
/// `data:` sources are already self-contained and empty sources point
/// nowhere; both are skipped.
///
/// # Errors
///
/// Returns `ExportError::ResourceFetch` with `FetchFailure::InvalidUrl` when
/// a source cannot be resolved against `base_url`.
pub fn collect_image_references(document: &Document, base_url: &Url) -> ExportResult<Vec<ImageReference>> {
    let mut references = Vec::new();
    for id in document.elements() {
        let Some(element) = document.element(id) else {
            continue;
        };
        if element.name() != "img" {
            continue;
        }
        let Some(src) = element.attr("src").map(str::trim) else {
            continue;
        };
        if src.is_empty() || src.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
            continue;
        }
        let url = resolve_url(base_url, src).map_err(|e| ExportError::ResourceFetch {
            url: src.to_string(),
            cause: FetchFailure::InvalidUrl(e.to_string()),
            attempts: 0,
        })?;
        references.push(ImageReference {
            node: id,
            url: url.to_string(),
        });
    }
    Ok(references)
}

/// Distinct URLs in first-encounter order
fn distinct_urls(references: &[ImageReference]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    references
        .iter()
        .filter(|r| seen.insert(r.url.as_str()))
        .map(|r| r.url.clone())
        .collect()
}

/// Image type: payload signature, then declared `image/*`, then the URL
/// extension, then `image/png`
fn image_mime(resource: &FetchedResource) -> Result<Mime, FetchFailure> {
    if resource.is_empty() {
        return Err(FetchFailure::UnexpectedContent("empty image payload".to_string()));
    }
    if let Some(sniffed) = &resource.sniffed_type {
        if sniffed.type_() == mime::IMAGE {
            return Ok(sniffed.clone());
        }
        return Err(FetchFailure::UnexpectedContent(format!(
            "expected an image, got {sniffed}"
        )));
    }

    let declared = resource.declared_type.as_deref().and_then(sniff::parse_declared);
    if let Some(declared) = &declared {
        if declared.type_() == mime::IMAGE {
            return Ok(declared.clone());
        }
        if declared.essence_str() == mime::TEXT_HTML.essence_str() {
            return Err(FetchFailure::UnexpectedContent(
                "expected an image, got an HTML page".to_string(),
            ));
        }
    }

    if let Some(guess) = sniff::guess_from_path(resource.url.path()).filter(|m| m.type_() == mime::IMAGE) {
        return Ok(guess);
    }

    log::warn!("Could not determine image type of {}, assuming image/png", resource.url);
    Ok(mime::IMAGE_PNG)
}

pub struct ImageEmbedder<'a, T: Transport> {
    fetcher: &'a ResourceFetcher<T>,
    base_url: &'a Url,
}

impl<'a, T: Transport> ImageEmbedder<'a, T> {
    #[must_use]
    pub fn new(fetcher: &'a ResourceFetcher<T>, base_url: &'a Url) -> Self {
        Self { fetcher, base_url }
    }

    /// Fetch every image of `document`, rewrite its references to `cid:`
    /// and return the embedded images in first-encounter order.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::ResourceFetch` if any image cannot be fetched or
    /// is not an image. The document is left untouched in that case.
    pub async fn embed(
        &self,
        document: &mut Document,
        credentials: &Credentials,
        ids: &mut IdGenerator,
    ) -> ExportResult<Vec<EmbeddedResource>> {
        let references = collect_image_references(document, self.base_url)?;
        if references.is_empty() {
            log::debug!("No images to embed");
            return Ok(Vec::new());
        }

        let urls = distinct_urls(&references);
        log::info!(
            "Embedding {} image reference(s) from {} distinct URL(s)",
            references.len(),
            urls.len()
        );
        let fetched = self.fetcher.fetch_all(&urls, credentials).await?;

        // Validate everything before touching the document
        let mut typed = Vec::with_capacity(fetched.len());
        for (url, resource) in urls.iter().zip(fetched) {
            let mime = image_mime(&resource).map_err(|cause| ExportError::ResourceFetch {
                url: url.clone(),
                cause,
                attempts: resource.attempts,
            })?;
            typed.push((url, resource, mime));
        }

        let mut embedded = Vec::with_capacity(typed.len());
        let mut cid_by_url: HashMap<&str, String> = HashMap::with_capacity(typed.len());
        for (url, resource, mime) in typed {
            let content_id = ids.content_id();
            cid_by_url.insert(url.as_str(), content_id.cid_url());
            embedded.push(EmbeddedResource {
                filename: url_file_name(&resource.url),
                content_id,
                bytes: resource.bytes,
                mime,
                source_url: url.clone(),
            });
        }

        for reference in &references {
            if let Some(cid) = cid_by_url.get(reference.url.as_str()) {
                document.set_attr(reference.node, "src", cid);
            }
        }

        Ok(embedded)
    }
}
