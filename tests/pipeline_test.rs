//! End-to-end exports against a scripted wiki

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use mail_parser::{MessageParser, MimeHeaders};

use kodegen_tools_eml::attachments::AttachmentManifestEntry;
use kodegen_tools_eml::errors::{ExportError, ExportStage, FetchFailure};
use kodegen_tools_eml::fetcher::Credentials;
use kodegen_tools_eml::message::MessageHeaders;
use kodegen_tools_eml::pipeline::{EmlExporter, ExportRequest};

mod common;
use common::{PDF_BYTES, PNG_BYTES, Reply, ScriptedTransport};

fn fixed_headers(title: &str) -> MessageHeaders {
    let date = FixedOffset::east_opt(0)
        .and_then(|tz| tz.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single())
        .expect("valid date");
    MessageHeaders::new(ExportRequest::subject_for_title(title)).with_date(date)
}

fn exporter(transport: &Arc<ScriptedTransport>) -> EmlExporter<ScriptedTransport> {
    EmlExporter::with_transport(common::test_config(), Arc::clone(transport)).expect("exporter")
}

fn count_parts(bytes: &[u8], disposition: &str) -> usize {
    let message = MessageParser::default().parse(bytes).expect("parse back");
    message
        .parts
        .iter()
        .filter(|p| {
            p.content_disposition()
                .is_some_and(|d| d.ctype().eq_ignore_ascii_case(disposition))
        })
        .count()
}

#[tokio::test]
async fn test_single_image_page() {
    common::init_logger();
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("https://wiki.example/img/a.png", Reply::png());

    let request = ExportRequest::new(r#"<p>Hi <img src="/img/a.png"></p>"#).with_headers(fixed_headers("Home"));
    let output = exporter(&transport)
        .export(request, &Credentials::None)
        .await
        .expect("export");

    assert_eq!(output.embedded_images, 1);
    assert_eq!(output.attachments, 0);

    let message = MessageParser::default().parse(&output.bytes).expect("parse back");
    assert_eq!(message.subject(), Some("Confluence Export: Home"));

    let html = message.body_html(0).expect("html body");
    let image = message
        .parts
        .iter()
        .find(|p| p.content_id().is_some())
        .expect("embedded image part");
    let cid = image.content_id().expect("content id").trim_matches(|c| c == '<' || c == '>');
    assert!(html.contains(&format!(r#"src="cid:{cid}""#)), "{html}");
    assert!(html.contains(r#"alt="Image""#), "{html}");
    assert!(!html.contains("/img/a.png"), "{html}");
    assert_eq!(image.contents(), PNG_BYTES);
    assert_eq!(image.content_type().and_then(|c| c.subtype()), Some("png"));

    let text = message.body_text(0).expect("text body");
    assert!(text.contains("Hi"), "{text}");

    let raw = String::from_utf8(output.bytes).expect("ascii");
    assert!(!raw.contains("multipart/mixed"));
}

#[tokio::test]
async fn test_seeded_exports_are_byte_identical() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("https://wiki.example/img/a.png", Reply::png());
    transport.respond("https://wiki.example/files/a.pdf", Reply::bytes("application/pdf", PDF_BYTES));

    let request = ExportRequest::new(r#"<h1>T</h1><img src="/img/a.png"><img src="img/a.png">"#)
        .with_manifest(vec![AttachmentManifestEntry::new("a.pdf", "/files/a.pdf")])
        .with_headers(fixed_headers("T"));

    let exporter = exporter(&transport);
    let first = exporter
        .export(request.clone(), &Credentials::None)
        .await
        .expect("first export");
    let second = exporter
        .export(request, &Credentials::None)
        .await
        .expect("second export");
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.embedded_images, 1, "duplicate sources share one image");
}

#[tokio::test]
async fn test_failing_image_fails_the_export() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("https://wiki.example/img/ok.png", Reply::png());
    transport.respond("https://wiki.example/img/gone.png", Reply::status(410));

    let request = ExportRequest::new(r#"<img src="/img/ok.png"><img src="/img/gone.png">"#);
    let err = exporter(&transport)
        .export(request, &Credentials::None)
        .await
        .expect_err("export must fail");

    assert_eq!(err.stage(), ExportStage::Fetch);
    assert_eq!(err.failed_url(), Some("https://wiki.example/img/gone.png"));
    assert!(matches!(
        err,
        ExportError::ResourceFetch {
            cause: FetchFailure::Status(410),
            ..
        }
    ));
}

#[tokio::test]
async fn test_two_attachments_make_a_mixed_message() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("https://wiki.example/download/a.pdf", Reply::bytes("application/pdf", PDF_BYTES));
    transport.respond("https://wiki.example/download/notes.txt", Reply::bytes("text/plain", b"notes\n"));

    let manifest = vec![
        AttachmentManifestEntry::new("a.pdf", "/download/a.pdf"),
        AttachmentManifestEntry::new("notes.txt", "https://wiki.example/download/notes.txt"),
    ];
    let request = ExportRequest::new("<p>See attached.</p>")
        .with_manifest(manifest)
        .with_headers(fixed_headers("Files"));
    let output = exporter(&transport)
        .export(request, &Credentials::None)
        .await
        .expect("export");

    assert_eq!(output.attachments, 2);
    assert_eq!(output.embedded_images, 0);
    assert_eq!(count_parts(&output.bytes, "attachment"), 2);
    let raw = String::from_utf8(output.bytes).expect("ascii");
    assert!(raw.contains("Content-Type: multipart/mixed;"));
    assert!(raw.contains("Content-Type: application/pdf; name=\"a.pdf\""));
    assert!(raw.contains("Content-Type: text/plain; name=\"notes.txt\""));
}

#[tokio::test]
async fn test_failing_attachment_fails_the_export() {
    let transport = Arc::new(ScriptedTransport::new());
    let request = ExportRequest::new("<p>x</p>")
        .with_manifest(vec![AttachmentManifestEntry::new("a.pdf", "/download/a.pdf")]);
    let err = exporter(&transport)
        .export(request, &Credentials::None)
        .await
        .expect_err("missing attachment");
    assert_eq!(err.failed_url(), Some("https://wiki.example/download/a.pdf"));
}

#[tokio::test]
async fn test_page_without_images_fetches_nothing() {
    let transport = Arc::new(ScriptedTransport::new());
    let request = ExportRequest::new("<h1>Title</h1><p>Only text.</p>")
        .with_plain_text("Title\n\nOnly text.")
        .with_headers(fixed_headers("Text"));
    let output = exporter(&transport)
        .export(request, &Credentials::None)
        .await
        .expect("export");

    assert_eq!(output.embedded_images, 0);
    assert_eq!(transport.total_calls(), 0);
    let message = MessageParser::default().parse(&output.bytes).expect("parse back");
    let text = message.body_text(0).expect("text body").replace("\r\n", "\n");
    assert_eq!(text, "Title\n\nOnly text.");
    assert!(message.parts.iter().all(|p| p.content_id().is_none()));
}

#[tokio::test]
async fn test_malformed_stylesheet_is_rejected_up_front() {
    let config = kodegen_tools_eml::config::ExportConfig::builder()
        .base_url("https://wiki.example/")
        .stylesheet("p { color: red")
        .build()
        .expect("config");
    let result = EmlExporter::with_transport(config, Arc::new(ScriptedTransport::new()));
    assert!(matches!(result, Err(ExportError::StyleParse(_))));
}
