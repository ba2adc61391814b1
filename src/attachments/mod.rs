//! Attachment manifest resolution
//!
//! Each manifest entry becomes exactly one attachment, in manifest order.
//! Downloads share the export's fetcher so image and attachment fetches
//! draw from one concurrency budget.

use mime::Mime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::errors::{ExportError, ExportResult, FetchFailure};
use crate::fetcher::{Credentials, FetchedResource, ResourceFetcher, Transport, sniff};
use crate::utils::{resolve_url, url_file_name};

/// One file the page links as an attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentManifestEntry {
    pub filename: String,
    pub url: String,
    #[serde(default, alias = "mediaType", alias = "content_type")]
    pub declared_type: Option<String>,
}

impl AttachmentManifestEntry {
    #[must_use]
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            declared_type: None,
        }
    }

    #[must_use]
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }
}

/// Parse a JSON array of manifest entries.
///
/// # Errors
///
/// Returns `ExportError::MalformedInput` if the JSON does not describe a
/// list of entries.
pub fn parse_manifest(json: &str) -> ExportResult<Vec<AttachmentManifestEntry>> {
    serde_json::from_str(json)
        .map_err(|e| ExportError::MalformedInput(format!("invalid attachment manifest: {e}")))
}

/// A downloaded attachment
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: Mime,
    pub source_url: String,
}

impl ResolvedAttachment {
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// File name safe for a Content-Disposition header and any file system
fn attachment_filename(entry: &AttachmentManifestEntry, url: &Url, position: usize) -> String {
    let cleaned = sanitize_filename::sanitize(entry.filename.trim());
    if !cleaned.trim().is_empty() {
        return cleaned;
    }
    url_file_name(url)
        .map(sanitize_filename::sanitize)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("attachment-{position}"))
}

/// Manifest type, then payload signature, then response header, then the
/// file name extension, then `application/octet-stream`
fn attachment_mime(entry: &AttachmentManifestEntry, filename: &str, resource: &FetchedResource) -> Mime {
    entry
        .declared_type
        .as_deref()
        .and_then(sniff::parse_declared)
        .or_else(|| resource.sniffed_type.clone())
        .or_else(|| resource.declared_type.as_deref().and_then(sniff::parse_declared))
        .or_else(|| sniff::guess_from_path(filename))
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

pub struct AttachmentResolver<'a, T: Transport> {
    fetcher: &'a ResourceFetcher<T>,
    base_url: &'a Url,
}

impl<'a, T: Transport> AttachmentResolver<'a, T> {
    #[must_use]
    pub fn new(fetcher: &'a ResourceFetcher<T>, base_url: &'a Url) -> Self {
        Self { fetcher, base_url }
    }

    /// Download and classify every manifest entry.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::ResourceFetch` for the first entry that cannot be
    /// fetched; no partial list is returned.
    pub async fn resolve(
        &self,
        manifest: &[AttachmentManifestEntry],
        credentials: &Credentials,
    ) -> ExportResult<Vec<ResolvedAttachment>> {
        if manifest.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved_urls = Vec::with_capacity(manifest.len());
        for entry in manifest {
            let url = resolve_url(self.base_url, &entry.url).map_err(|e| ExportError::ResourceFetch {
                url: entry.url.clone(),
                cause: FetchFailure::InvalidUrl(e.to_string()),
                attempts: 0,
            })?;
            resolved_urls.push(url);
        }

        // The same file may be listed twice; download it once
        let mut distinct: Vec<String> = Vec::new();
        let mut slot_of: HashMap<String, usize> = HashMap::new();
        for url in &resolved_urls {
            slot_of.entry(url.to_string()).or_insert_with(|| {
                distinct.push(url.to_string());
                distinct.len() - 1
            });
        }

        log::info!("Resolving {} attachment(s)", manifest.len());
        let fetched = self.fetcher.fetch_all(&distinct, credentials).await?;

        let mut attachments = Vec::with_capacity(manifest.len());
        for (position, (entry, url)) in manifest.iter().zip(&resolved_urls).enumerate() {
            let resource = slot_of
                .get(url.as_str())
                .and_then(|&slot| fetched.get(slot))
                .ok_or_else(|| ExportError::Invariant(format!("no fetch result for {url}")))?;
            let filename = attachment_filename(entry, url, position + 1);
            let mime = attachment_mime(entry, &filename, resource);
            log::debug!("Attachment '{filename}' ({mime}, {} bytes)", resource.len());
            attachments.push(ResolvedAttachment {
                filename,
                bytes: resource.bytes.clone(),
                mime,
                source_url: url.to_string(),
            });
        }
        Ok(attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(bytes: &[u8], declared: Option<&str>) -> FetchedResource {
        FetchedResource {
            url: Url::parse("https://wiki.example/download/x").expect("valid"),
            bytes: bytes.to_vec(),
            content_type: mime::APPLICATION_OCTET_STREAM,
            sniffed_type: sniff::sniff(bytes),
            declared_type: declared.map(str::to_string),
            attempts: 1,
        }
    }

    #[test]
    fn test_manifest_json_accepts_aliases() {
        let manifest = parse_manifest(
            r#"[{"filename":"a.pdf","url":"/a.pdf","mediaType":"application/pdf"},
                {"filename":"b.txt","url":"https://x/b.txt"}]"#,
        )
        .expect("valid manifest");
        assert_eq!(manifest[0].declared_type.as_deref(), Some("application/pdf"));
        assert_eq!(manifest[1].declared_type, None);
        assert!(parse_manifest(r#"{"filename":"a"}"#).is_err());
    }

    #[test]
    fn test_mime_classification_order() {
        let entry = AttachmentManifestEntry::new("report.docx", "/r");
        // Generic header and zip payload: the file name decides
        let docx = attachment_mime(&entry, "report.docx", &fetched(b"PK\x03\x04", Some("application/octet-stream")));
        assert_eq!(
            docx.essence_str(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );

        // Signature beats header and name
        let pdf = attachment_mime(&entry, "report.docx", &fetched(b"%PDF-1.4", Some("text/plain")));
        assert_eq!(pdf, mime::APPLICATION_PDF);

        // Manifest beats everything
        let declared = entry.clone().with_declared_type("text/csv");
        assert_eq!(
            attachment_mime(&declared, "report.docx", &fetched(b"%PDF-1.4", None)),
            mime::TEXT_CSV
        );

        let unknown = AttachmentManifestEntry::new("blob", "/b");
        assert_eq!(
            attachment_mime(&unknown, "blob", &fetched(b"\x01\x02", None)),
            mime::APPLICATION_OCTET_STREAM
        );
    }

    #[test]
    fn test_filenames_are_sanitized_with_fallbacks() {
        let url = Url::parse("https://wiki.example/download/attachments/1/spec%20v2.pdf").expect("valid");
        let entry = AttachmentManifestEntry::new("../../etc/passwd", "/x");
        let name = attachment_filename(&entry, &url, 1);
        assert!(!name.contains('/'), "{name}");

        let blank = AttachmentManifestEntry::new("  ", "/x");
        assert_eq!(attachment_filename(&blank, &url, 2), "spec v2.pdf");

        let root = Url::parse("https://wiki.example/").expect("valid");
        assert_eq!(attachment_filename(&blank, &root, 3), "attachment-3");
    }
}
