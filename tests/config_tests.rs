//! Tests for the type-safe configuration builder pattern

use std::time::Duration;

use kodegen_tools_eml::config::ExportConfig;
use kodegen_tools_eml::errors::{ExportError, ExportStage};

mod common;

#[test]
fn test_builder_requires_base_url() {
    // This should not compile if uncommented - base_url is required
    // let config = ExportConfig::builder().build();

    let config = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .build()
        .expect("valid config");
    assert_eq!(config.base_url().as_str(), "https://wiki.example/");
}

#[test]
fn test_builder_optional_fields_have_defaults() {
    let config = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .build()
        .expect("valid config");

    assert_eq!(config.stylesheet(), None);
    assert_eq!(config.max_concurrent_fetches(), 4);
    assert_eq!(config.max_fetch_retries(), 3);
    assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    assert_eq!(config.content_id_domain(), "confluence-export");
    assert_eq!(config.default_image_alt(), "Image");
    assert_eq!(config.id_seed(), None);
    assert!(config.remove_email_incompatible());
    assert!(config.scope_credentials_to_origin());
    assert!(config.user_agent().starts_with("kodegen-eml/"));
}

#[test]
fn test_setters_work_before_and_after_base_url() {
    let config = ExportConfig::builder()
        .max_concurrent_fetches(8)
        .id_seed(7)
        .base_url("https://wiki.example/")
        .max_fetch_retries(1)
        .retry_delays_ms(10, 100)
        .max_concurrent_fetches(2) // Override previous value
        .default_from("Wiki <wiki@example.com>")
        .stylesheet("p { margin: 0 }")
        .build()
        .expect("valid config");

    assert_eq!(config.max_concurrent_fetches(), 2);
    assert_eq!(config.id_seed(), Some(7));
    assert_eq!(config.default_from(), "Wiki <wiki@example.com>");
    assert_eq!(config.stylesheet(), Some("p { margin: 0 }"));
    let retry = config.retry_config();
    assert_eq!(retry.max_retries, 1);
    assert_eq!(retry.initial_delay, Duration::from_millis(10));
    assert_eq!(retry.max_delay, Duration::from_millis(100));
}

#[test]
fn test_url_normalization_in_builder() {
    let test_cases = vec![
        ("wiki.example", "https://wiki.example/"),
        ("http://wiki.example", "http://wiki.example/"),
        ("https://wiki.example/display/DOC/", "https://wiki.example/display/DOC/"),
        ("  https://wiki.example/x  ", "https://wiki.example/x"),
    ];

    for (input, expected) in test_cases {
        let config = ExportConfig::builder()
            .base_url(input)
            .build()
            .expect("valid config");
        assert_eq!(config.base_url().as_str(), expected);
    }
}

#[test]
fn test_config_validation_logic() {
    let zero_fetches = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .max_concurrent_fetches(0)
        .build();
    assert!(zero_fetches.is_err());

    let inverted_delays = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .retry_delays_ms(500, 100)
        .build();
    assert!(inverted_delays.is_err());

    let bad_domain = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .content_id_domain("has space")
        .build();
    assert!(bad_domain.is_err());

    let no_host = ExportConfig::builder().base_url("https://").build();
    assert!(no_host.is_err());
}

#[test]
fn test_blank_alt_text_falls_back() {
    let config = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .default_image_alt("   ")
        .build()
        .expect("valid config");
    assert_eq!(config.default_image_alt(), "Image");
}

#[test]
fn test_builder_errors_convert_to_config_errors() {
    let err: ExportError = ExportConfig::builder()
        .base_url("https://wiki.example/")
        .fetch_timeout_secs(0)
        .build()
        .expect_err("zero timeout")
        .into();
    assert_eq!(err.stage(), ExportStage::Configure);
}

#[test]
fn test_config_serialization() {
    let config = common::test_config();

    let json = serde_json::to_string(&config).expect("serialize");
    assert!(json.contains("https://wiki.example/"));

    let restored: ExportConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored.base_url(), config.base_url());
    assert_eq!(restored.id_seed(), Some(42));
}
