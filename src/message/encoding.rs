//! Transfer encodings and header value encoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::utils::BASE64_LINE_LENGTH;

/// Longest header line before folding, excluding CRLF
const MAX_HEADER_LINE: usize = 78;

/// Raw bytes per RFC 2047 encoded word; 45 bytes encode to 60 base64 chars,
/// keeping each `=?utf-8?B?...?=` word under 75 characters.
const ENCODED_WORD_BYTES: usize = 45;

/// Convert any mix of `\r\n`, `\r` and `\n` to CRLF
#[must_use]
pub fn normalize_crlf(text: &str) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    unix.replace('\n', "\r\n")
}

/// Quoted-printable body for a UTF-8 text part. Line breaks are carried as
/// hard CRLF breaks and long lines get soft breaks.
#[must_use]
pub fn quoted_printable_body(text: &str) -> String {
    quoted_printable::encode_to_str(normalize_crlf(text))
}

/// Base64 body wrapped at 76 characters per line, CRLF separated
#[must_use]
pub fn base64_body(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2);
    for (i, chunk) in encoded.as_bytes().chunks(BASE64_LINE_LENGTH).enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        // base64 output is ASCII, chunks never split a character
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    out
}

/// Replace CR and LF so a value cannot start a new header
#[must_use]
pub fn strip_line_breaks(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

fn is_plain_ascii(value: &str) -> bool {
    value.bytes().all(|b| (0x20..0x7f).contains(&b) || b == b'\t')
}

/// UTF-8 chunks of at most `max` bytes, split on character boundaries
fn utf8_chunks(value: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (index, c) in value.char_indices() {
        let next = index + c.len_utf8();
        if next - start > max && end > start {
            chunks.push(&value[start..end]);
            start = end;
        }
        end = next;
    }
    if end > start {
        chunks.push(&value[start..end]);
    }
    chunks
}

/// RFC 2047 base64 encoded words joined by folding whitespace
fn encoded_words(value: &str) -> String {
    utf8_chunks(value, ENCODED_WORD_BYTES)
        .into_iter()
        .map(|chunk| format!("=?utf-8?B?{}?=", STANDARD.encode(chunk)))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Fold an ASCII header at whitespace so lines stay within 78 characters.
/// A single word longer than the limit is left on its own line.
fn fold_ascii(name: &str, value: &str) -> String {
    let mut out = format!("{name}:");
    let mut line_len = out.len();
    let value = format!(" {value}");
    let mut rest = value.as_str();
    while !rest.is_empty() {
        // One segment is a whitespace run plus the word after it
        let word_start = rest.find(|c: char| c != ' ' && c != '\t').unwrap_or(rest.len());
        let word_end = rest[word_start..]
            .find([' ', '\t'])
            .map_or(rest.len(), |i| word_start + i);
        let (segment, tail) = rest.split_at(word_end);
        rest = tail;

        // Fold only in front of existing whitespace, never leaving a blank line
        if line_len + segment.len() > MAX_HEADER_LINE
            && line_len > name.len() + 1
            && word_start > 0
            && word_start < segment.len()
        {
            out.push_str("\r\n");
            line_len = 0;
        }
        out.push_str(segment);
        line_len += segment.len();
    }
    out
}

/// Complete header line for an unstructured value such as `Subject`, without
/// the trailing CRLF. Non-ASCII values become RFC 2047 encoded words.
#[must_use]
pub fn unstructured_header(name: &str, value: &str) -> String {
    let value = strip_line_breaks(value);
    if is_plain_ascii(&value) {
        fold_ascii(name, &value)
    } else {
        format!("{name}: {}", encoded_words(&value))
    }
}

/// Characters that force a display name into a quoted string
fn needs_quoting(display: &str) -> bool {
    display
        .chars()
        .any(|c| matches!(c, '(' | ')' | '<' | '>' | '[' | ']' | ':' | ';' | '@' | '\\' | ',' | '.' | '"'))
}

/// Split an address list on commas outside quoted strings
fn split_addresses(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (index, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// One mailbox, `Name <addr>` or a bare address
fn encode_mailbox(mailbox: &str) -> String {
    let Some((display, rest)) = mailbox.rsplit_once('<') else {
        return mailbox.to_string();
    };
    let display = display.trim();
    let address = format!("<{}", rest.trim());
    if display.is_empty() {
        return address;
    }
    let unquoted = display
        .strip_prefix('"')
        .and_then(|d| d.strip_suffix('"'))
        .map(|d| d.replace("\\\"", "\"").replace("\\\\", "\\"))
        .unwrap_or_else(|| display.to_string());

    if !is_plain_ascii(&unquoted) {
        format!("{} {address}", encoded_words(&unquoted))
    } else if needs_quoting(&unquoted) {
        let escaped = unquoted.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\" {address}")
    } else {
        format!("{unquoted} {address}")
    }
}

/// Complete header line for an address list such as `From` or `To`
#[must_use]
pub fn address_header(name: &str, value: &str) -> String {
    let value = strip_line_breaks(value);
    let mailboxes: Vec<String> = split_addresses(&value).into_iter().map(encode_mailbox).collect();
    let mut out = format!("{name}: ");
    let mut line_len = out.len();
    for (i, mailbox) in mailboxes.iter().enumerate() {
        if i > 0 {
            out.push(',');
            line_len += 1;
            if line_len + 1 + mailbox.len() > MAX_HEADER_LINE {
                out.push_str("\r\n ");
                line_len = 1;
            } else {
                out.push(' ');
                line_len += 1;
            }
        }
        out.push_str(mailbox);
        line_len += mailbox.rsplit("\r\n").next().map_or(0, str::len);
    }
    out
}

/// `name="value"` parameter, RFC 2047 encoded when the value is not ASCII
#[must_use]
pub fn quoted_param(name: &str, value: &str) -> String {
    let value = strip_line_breaks(value);
    if is_plain_ascii(&value) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{name}=\"{escaped}\"")
    } else {
        let words = utf8_chunks(&value, ENCODED_WORD_BYTES)
            .into_iter()
            .map(|chunk| format!("=?utf-8?B?{}?=", STANDARD.encode(chunk)))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{name}=\"{words}\"")
    }
}

/// `filename` parameter for `Content-Disposition`. Non-ASCII names use the
/// RFC 2231 extended form `filename*=utf-8''...`.
#[must_use]
pub fn filename_param(value: &str) -> String {
    let value = strip_line_breaks(value);
    if is_plain_ascii(&value) {
        quoted_param("filename", &value)
    } else {
        format!("filename*=utf-8''{}", urlencoding::encode(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_normalization() {
        assert_eq!(normalize_crlf("a\nb\r\nc\rd"), "a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_base64_lines_are_wrapped() {
        let body = base64_body(&[0u8; 200]);
        let lines: Vec<&str> = body.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 76));
        assert_eq!(lines[0].len(), 76);
    }

    #[test]
    fn test_quoted_printable_keeps_hard_breaks() {
        let body = quoted_printable_body("Caf\u{e9}\nline two");
        assert_eq!(body, "Caf=C3=A9\r\nline two");
    }

    #[test]
    fn test_header_injection_is_neutralized() {
        let header = unstructured_header("Subject", "Hi\r\nBcc: victim@example.com");
        assert!(!header.contains("\r\nBcc"), "{header}");
    }

    #[test]
    fn test_non_ascii_subject_uses_encoded_words() {
        let header = unstructured_header("Subject", "R\u{e9}sum\u{e9}");
        assert_eq!(header, "Subject: =?utf-8?B?UsOpc3Vtw6k=?=");
        let long = unstructured_header("Subject", &"\u{fc}".repeat(60));
        for line in long.split("\r\n") {
            assert!(line.len() <= 78, "{line}");
        }
    }

    #[test]
    fn test_long_ascii_subject_is_folded() {
        let subject = "word ".repeat(40);
        let header = unstructured_header("Subject", &subject);
        assert!(header.contains("\r\n "));
        for line in header.split("\r\n") {
            assert!(line.len() <= 78, "{line}");
        }
    }

    #[test]
    fn test_subject_whitespace_runs_survive_folding() {
        assert_eq!(
            unstructured_header("Subject", "Q3  report\tfinal"),
            "Subject: Q3  report\tfinal"
        );

        let subject = format!("{}   tail", "x".repeat(70));
        let header = unstructured_header("Subject", &subject);
        assert_eq!(header, format!("Subject: {}\r\n   tail", "x".repeat(70)));
        let unfolded = header.replace("\r\n", "");
        assert_eq!(unfolded, format!("Subject: {subject}"));
    }

    #[test]
    fn test_mailbox_display_names() {
        assert_eq!(address_header("To", "user@localhost"), "To: user@localhost");
        assert_eq!(
            address_header("From", "Wiki Export <wiki@example.com>"),
            "From: Wiki Export <wiki@example.com>"
        );
        assert_eq!(
            address_header("From", "Jane Q. Doe <jane@example.com>"),
            "From: \"Jane Q. Doe\" <jane@example.com>"
        );
        assert_eq!(
            address_header("To", "\"Doe, Jane\" <jane@example.com>, bob@example.com"),
            "To: \"Doe, Jane\" <jane@example.com>, bob@example.com"
        );
        assert!(address_header("From", "J\u{f6}rg <j@example.com>").starts_with("From: =?utf-8?B?"));
    }

    #[test]
    fn test_filename_params() {
        assert_eq!(filename_param("report.pdf"), "filename=\"report.pdf\"");
        assert_eq!(filename_param("a\"b.txt"), "filename=\"a\\\"b.txt\"");
        assert_eq!(filename_param("\u{fc}ber.pdf"), "filename*=utf-8''%C3%BCber.pdf");
    }

    #[test]
    fn test_utf8_chunks_respect_boundaries() {
        let text = "\u{e9}".repeat(30);
        let chunks = utf8_chunks(&text, 45);
        assert!(chunks.iter().all(|c| c.len() <= 45));
        assert_eq!(chunks.concat(), text);
    }
}
