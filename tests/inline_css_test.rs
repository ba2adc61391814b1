//! Style inlining and URL absolutization

use kodegen_tools_eml::document::Document;
use kodegen_tools_eml::errors::ExportError;
use kodegen_tools_eml::inline_css::{self, EMAIL_STYLESHEET, StyleInliner};
use url::Url;

mod common;

fn base() -> Url {
    Url::parse("https://wiki.example/display/DOC/Page").expect("valid base")
}

fn style_of(doc: &Document, id: &str) -> Option<String> {
    doc.elements()
        .into_iter()
        .filter_map(|n| doc.element(n))
        .find(|e| e.id() == Some(id))
        .and_then(|e| e.attr("style").map(str::to_string))
}

#[test]
fn test_specificity_and_source_order() {
    common::init_logger();
    let mut doc = Document::parse(
        r#"<div class="panel"><p id="a" class="note">x</p><p id="b">y</p></div>"#,
    )
    .expect("parse");
    let css = r"
        p { color: black; margin: 0 }
        .panel p { color: blue }
        p.note { color: green }
        p { margin: 4px }
    ";
    inline_css::inline(&mut doc, css, &base()).expect("inline");

    // .panel p and p.note tie on specificity; the later rule wins
    assert_eq!(style_of(&doc, "a").as_deref(), Some("color: green; margin: 4px"));
    assert_eq!(style_of(&doc, "b").as_deref(), Some("color: blue; margin: 4px"));
}

#[test]
fn test_important_beats_specificity() {
    let mut doc = Document::parse(r#"<p id="a" class="x">x</p>"#).expect("parse");
    inline_css::inline(&mut doc, "p { color: red !important } #a.x { color: blue }", &base()).expect("inline");
    assert_eq!(style_of(&doc, "a").as_deref(), Some("color: red !important"));
}

#[test]
fn test_existing_inline_style_wins() {
    let mut doc = Document::parse(r#"<p id="a" style="color: purple">x</p>"#).expect("parse");
    inline_css::inline(&mut doc, "p { color: red; font-size: 12px }", &base()).expect("inline");
    assert_eq!(
        style_of(&doc, "a").as_deref(),
        Some("font-size: 12px; color: purple")
    );
}

#[test]
fn test_unmatched_elements_are_untouched() {
    let html = r#"<p id="a" style="color: purple">x</p><span id="b">y</span>"#;
    let mut doc = Document::parse(html).expect("parse");
    let before = doc.to_html();
    inline_css::inline(&mut doc, "table { border: 0 }", &base()).expect("inline");
    assert_eq!(doc.to_html(), before);
}

#[test]
fn test_relative_urls_are_absolutized() {
    let mut doc = Document::parse(
        r##"<a id="l" href="../Other">o</a>
            <a href="#section">s</a>
            <a href="mailto:a@example.com">m</a>
            <img src="/download/attachments/1/a.png" alt="a">
            <div style="background: url('bg.png')">c</div>"##,
    )
    .expect("parse");
    StyleInliner::from_css("").expect("empty sheet").inline(&mut doc, &base());
    let html = doc.to_html();
    assert!(html.contains(r#"href="https://wiki.example/display/Other""#), "{html}");
    assert!(html.contains(r##"href="#section""##), "{html}");
    assert!(html.contains(r#"href="mailto:a@example.com""#), "{html}");
    assert!(html.contains(r#"src="https://wiki.example/download/attachments/1/a.png""#), "{html}");
    assert!(html.contains("url('https://wiki.example/display/DOC/bg.png')"), "{html}");
}

#[test]
fn test_pseudo_selectors_and_media_blocks_are_skipped() {
    let sheet = StyleInliner::from_css(
        "a:hover { color: red } @media (max-width: 600px) { p { margin: 0 } } p { margin: 1px }",
    )
    .expect("parse");
    assert_eq!(sheet.sheet().rules().len(), 1);
    assert_eq!(sheet.sheet().skipped(), 2);
}

#[test]
fn test_attribute_selectors_with_commas_and_comment_markers() {
    let mut doc = Document::parse(
        r#"<a id="t" title="a,b" href="/x">t</a><a id="c" href="/*x">c</a><p id="p">p</p>"#,
    )
    .expect("parse");
    let css = r#"a[title="a,b"] { color: red } a[href^="/*"] { color: blue } :is(h1, h2) { color: gray } p { margin: 0 }"#;
    inline_css::inline(&mut doc, css, &base()).expect("inline");
    assert_eq!(style_of(&doc, "t").as_deref(), Some("color: red"));
    assert_eq!(style_of(&doc, "c").as_deref(), Some("color: blue"));
    assert_eq!(style_of(&doc, "p").as_deref(), Some("margin: 0"));
}

#[test]
fn test_malformed_sheet_is_style_parse_error() {
    let mut doc = Document::parse("<p>x</p>").expect("parse");
    for css in ["p { color: red", "p { color red }", "/* open", "} p {}"] {
        let err = inline_css::inline(&mut doc, css, &base()).expect_err(css);
        assert!(matches!(err, ExportError::StyleParse(_)), "{css}: {err:?}");
    }
}

#[test]
fn test_default_email_sheet_styles_body_content() {
    let mut doc = Document::parse(r#"<h1 id="h">Title</h1><table id="t"><tr><td>x</td></tr></table>"#)
        .expect("parse");
    inline_css::inline(&mut doc, EMAIL_STYLESHEET, &base()).expect("inline");
    assert!(style_of(&doc, "h").is_some());
    assert!(style_of(&doc, "t").is_some());
}
