//! RFC 5322 / MIME message assembly
//!
//! Structure, outermost first:
//!
//! ```text
//! multipart/mixed                  (only when there are attachments)
//! ├── multipart/related
//! │   ├── multipart/alternative
//! │   │   ├── text/plain
//! │   │   └── text/html
//! │   └── image/*                  (one per embedded image, inline)
//! └── application/*                (one per attachment)
//! ```
//!
//! Output uses CRLF line endings throughout. Identifiers and the date are
//! the only varying inputs, so a seeded generator and a fixed date give
//! identical bytes.

pub mod encoding;
mod part;

pub use part::{MimePart, PartBody};

use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{HashMap, HashSet};

use crate::attachments::ResolvedAttachment;
use crate::config::ExportConfig;
use crate::document::Document;
use crate::embedder::EmbeddedResource;
use crate::errors::{ExportError, ExportResult};
use crate::ids::IdGenerator;
use crate::utils::{DEFAULT_FROM, DEFAULT_TO, SUBJECT_PREFIX};

use encoding::{address_header, filename_param, quoted_param, unstructured_header};

/// Caller-supplied header fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    pub subject: String,
    /// Falls back to the configured sender
    pub from: Option<String>,
    /// Falls back to the configured recipient
    pub to: Option<String>,
    /// Falls back to the current time
    pub date: Option<DateTime<FixedOffset>>,
}

impl MessageHeaders {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// `Confluence Export: <title>`
    #[must_use]
    pub fn for_page_title(title: &str) -> Self {
        Self::new(format!("{SUBJECT_PREFIX}{}", title.trim()))
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }
}

/// A complete message ready for serialization
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMessage {
    /// Top-level headers, already encoded, in output order
    header_lines: Vec<String>,
    message_id: String,
    root: MimePart,
}

impl AssembledMessage {
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Outermost MIME entity
    #[must_use]
    pub fn root(&self) -> &MimePart {
        &self.root
    }

    /// Serialize to `.eml` bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = String::new();
        for line in &self.header_lines {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out.push_str("MIME-Version: 1.0\r\n");
        self.root.write_to(&mut out);
        out.into_bytes()
    }
}

/// Builds the MIME tree around the final HTML
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    default_from: String,
    default_to: String,
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self {
            default_from: DEFAULT_FROM.to_string(),
            default_to: DEFAULT_TO.to_string(),
        }
    }
}

impl MessageAssembler {
    #[must_use]
    pub fn new(default_from: impl Into<String>, default_to: impl Into<String>) -> Self {
        Self {
            default_from: default_from.into(),
            default_to: default_to.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.default_from(), config.default_to())
    }

    /// Assemble the message.
    ///
    /// Embedded images appear in the given order inside `multipart/related`,
    /// attachments in the given order inside `multipart/mixed`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Invariant` if the HTML references a Content-ID
    /// that is not embedded, an embedded image is never referenced, or two
    /// images share a Content-ID.
    pub fn assemble(
        &self,
        plain_text: &str,
        html: &str,
        embedded: Vec<EmbeddedResource>,
        attachments: Vec<ResolvedAttachment>,
        headers: &MessageHeaders,
        ids: &mut IdGenerator,
    ) -> ExportResult<AssembledMessage> {
        check_content_ids(html, &embedded)?;

        let alternative = MimePart::multipart(
            "alternative",
            &[],
            ids.boundary(),
            vec![MimePart::text("plain", plain_text), MimePart::text("html", html)],
        );

        let mut related_parts = Vec::with_capacity(embedded.len() + 1);
        related_parts.push(alternative);
        related_parts.extend(embedded.into_iter().map(image_part));
        let related = MimePart::multipart(
            "related",
            &["type=\"multipart/alternative\"".to_string()],
            ids.boundary(),
            related_parts,
        );

        let root = if attachments.is_empty() {
            related
        } else {
            let mut mixed_parts = Vec::with_capacity(attachments.len() + 1);
            mixed_parts.push(related);
            mixed_parts.extend(attachments.into_iter().map(attachment_part));
            MimePart::multipart("mixed", &[], ids.boundary(), mixed_parts)
        };

        let message_id = ids.message_id();
        let date = headers
            .date
            .unwrap_or_else(|| Utc::now().fixed_offset());
        let from = headers.from.as_deref().unwrap_or(&self.default_from);
        let to = headers.to.as_deref().unwrap_or(&self.default_to);

        let header_lines = vec![
            address_header("From", from),
            address_header("To", to),
            unstructured_header("Subject", &headers.subject),
            format!("Date: {}", date.to_rfc2822()),
            format!("Message-ID: {message_id}"),
        ];

        log::debug!("Assembled message {message_id} ({})", root.content_type());
        Ok(AssembledMessage {
            header_lines,
            message_id,
            root,
        })
    }
}

fn image_part(image: EmbeddedResource) -> MimePart {
    let mut content_type = image.mime.essence_str().to_string();
    let mut disposition = "inline".to_string();
    if let Some(filename) = image.filename.as_deref().filter(|f| !f.is_empty()) {
        content_type.push_str("; ");
        content_type.push_str(&quoted_param("name", filename));
        disposition.push_str("; ");
        disposition.push_str(&filename_param(filename));
    }
    MimePart::binary(content_type, image.bytes)
        .with_header("Content-ID", image.content_id.header_value())
        .with_header("Content-Disposition", disposition)
}

fn attachment_part(attachment: ResolvedAttachment) -> MimePart {
    let content_type = format!(
        "{}; {}",
        attachment.mime.essence_str(),
        quoted_param("name", &attachment.filename)
    );
    let disposition = format!("attachment; {}", filename_param(&attachment.filename));
    MimePart::binary(content_type, attachment.bytes).with_header("Content-Disposition", disposition)
}

/// `cid:` references in attribute values, with multiplicity
fn content_id_references(html: &str) -> HashMap<String, usize> {
    let document = Document::parse_unbounded(html);
    let mut references = HashMap::new();
    for id in document.elements() {
        let Some(element) = document.element(id) else {
            continue;
        };
        for (_, value) in element.attrs() {
            let value = value.trim();
            let is_cid = value.get(..4).is_some_and(|scheme| scheme.eq_ignore_ascii_case("cid:"));
            if let Some(id) = value.get(4..).filter(|id| is_cid && !id.is_empty()) {
                *references.entry(id.to_string()).or_insert(0) += 1;
            }
        }
    }
    references
}

/// Referenced Content-IDs and embedded Content-IDs must be the same set
fn check_content_ids(html: &str, embedded: &[EmbeddedResource]) -> ExportResult<()> {
    let mut embedded_ids = HashSet::with_capacity(embedded.len());
    for image in embedded {
        if !embedded_ids.insert(image.content_id.bare()) {
            return Err(ExportError::Invariant(format!(
                "Content-ID {} is used by more than one image",
                image.content_id
            )));
        }
    }

    let references = content_id_references(html);
    let mut dangling: Vec<&str> = references
        .keys()
        .map(String::as_str)
        .filter(|id| !embedded_ids.contains(id))
        .collect();
    if !dangling.is_empty() {
        dangling.sort_unstable();
        return Err(ExportError::Invariant(format!(
            "HTML references missing Content-ID(s): {}",
            dangling.join(", ")
        )));
    }

    if let Some(orphan) = embedded
        .iter()
        .find(|image| !references.contains_key(image.content_id.bare()))
    {
        return Err(ExportError::Invariant(format!(
            "embedded image {} ({}) is never referenced",
            orphan.content_id, orphan.source_url
        )));
    }
    Ok(())
}
