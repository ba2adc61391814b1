//! MIME entity tree and its wire serialization

use super::encoding::{base64_body, quoted_printable_body};

/// Body of one MIME entity
#[derive(Debug, Clone, PartialEq)]
pub enum PartBody {
    /// UTF-8 text, sent quoted-printable
    Text(String),
    /// Arbitrary bytes, sent base64
    Binary(Vec<u8>),
    Multipart {
        boundary: String,
        parts: Vec<MimePart>,
    },
}

/// One MIME entity: its own headers plus a body
#[derive(Debug, Clone, PartialEq)]
pub struct MimePart {
    headers: Vec<(String, String)>,
    body: PartBody,
}

impl MimePart {
    /// `text/<subtype>; charset="utf-8"`, quoted-printable
    #[must_use]
    pub fn text(subtype: &str, text: impl Into<String>) -> Self {
        Self {
            headers: vec![
                (
                    "Content-Type".to_string(),
                    format!("text/{subtype}; charset=\"utf-8\""),
                ),
                (
                    "Content-Transfer-Encoding".to_string(),
                    "quoted-printable".to_string(),
                ),
            ],
            body: PartBody::Text(text.into()),
        }
    }

    /// Base64 leaf; `content_type` may carry parameters
    #[must_use]
    pub fn binary(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            headers: vec![
                ("Content-Type".to_string(), content_type.into()),
                ("Content-Transfer-Encoding".to_string(), "base64".to_string()),
            ],
            body: PartBody::Binary(bytes),
        }
    }

    /// `multipart/<subtype>` container. `extra_params` follow the subtype and
    /// precede the boundary.
    #[must_use]
    pub fn multipart(subtype: &str, extra_params: &[String], boundary: String, parts: Vec<MimePart>) -> Self {
        let mut content_type = format!("multipart/{subtype}");
        for param in extra_params {
            content_type.push_str("; ");
            content_type.push_str(param);
        }
        content_type.push_str(&format!(";\r\n boundary=\"{boundary}\""));
        Self {
            headers: vec![("Content-Type".to_string(), content_type)],
            body: PartBody::Multipart { boundary, parts },
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type without parameters, e.g. `multipart/related`
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header("Content-Type")
            .and_then(|v| v.split(';').next())
            .map_or("text/plain", str::trim)
    }

    #[must_use]
    pub fn body(&self) -> &PartBody {
        &self.body
    }

    /// Children of a multipart entity, empty for leaves
    #[must_use]
    pub fn parts(&self) -> &[MimePart] {
        match &self.body {
            PartBody::Multipart { parts, .. } => parts,
            _ => &[],
        }
    }

    /// Append headers, blank line and body. Every line ends with CRLF.
    pub(crate) fn write_to(&self, out: &mut String) {
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        self.write_body(out);
    }

    pub(crate) fn write_body(&self, out: &mut String) {
        match &self.body {
            PartBody::Text(text) => {
                out.push_str(&quoted_printable_body(text));
                out.push_str("\r\n");
            }
            PartBody::Binary(bytes) => {
                out.push_str(&base64_body(bytes));
                out.push_str("\r\n");
            }
            PartBody::Multipart { boundary, parts } => {
                for part in parts {
                    out.push_str("--");
                    out.push_str(boundary);
                    out.push_str("\r\n");
                    part.write_to(out);
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
            }
        }
    }
}
