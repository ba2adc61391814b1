//! Test utilities shared by the integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_eml::config::ExportConfig;
use kodegen_tools_eml::errors::FetchFailure;
use kodegen_tools_eml::fetcher::{FetchRequest, RawResponse, Transport, TransportFuture};

/// Smallest payload the sniffer recognises as PNG (10 bytes)
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0";

#[allow(dead_code)]
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\0\x01\0\0\0\0;";

#[allow(dead_code)]
pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

/// Install a test logger once; later calls are no-ops
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a test HTML document with specified content
#[allow(dead_code)]
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
</head>
<body>
    {}
</body>
</html>"#,
        html_escape::encode_text(title),
        body
    )
}

/// Deterministic config rooted at `https://wiki.example/`
#[allow(dead_code)]
pub fn test_config() -> ExportConfig {
    test_config_for("https://wiki.example/")
}

#[allow(dead_code)]
pub fn test_config_for(base_url: &str) -> ExportConfig {
    ExportConfig::builder()
        .base_url(base_url)
        .id_seed(42)
        .retry_delays_ms(1, 4)
        .build()
        .expect("Failed to create test config")
}

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Body {
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Fail(FetchFailure),
}

#[allow(dead_code)]
impl Reply {
    pub fn bytes(content_type: &str, body: &[u8]) -> Self {
        Reply::Body {
            content_type: Some(content_type.to_string()),
            body: body.to_vec(),
        }
    }

    pub fn png() -> Self {
        Reply::bytes("image/png", PNG_BYTES)
    }

    pub fn status(code: u16) -> Self {
        Reply::Fail(FetchFailure::Status(code))
    }
}

/// Decrements the in-flight counter even when the attempt is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory transport with per-URL reply queues.
///
/// Replies for a URL are consumed in order; the last one repeats. URLs
/// without a script answer HTTP 404.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, bool)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt takes `delay` before replying
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn respond(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Attempts made for `url`
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether the last attempt for `url` carried credentials
    pub fn sent_credentials(&self, url: &str) -> Option<bool> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, with)| *with)
    }

    /// Highest number of simultaneous attempts observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::status(404)),
            None => Reply::status(404),
        }
    }
}

impl Transport for ScriptedTransport {
    fn get<'a>(&'a self, request: FetchRequest<'a>) -> TransportFuture<'a> {
        Box::pin(async move {
            let url = request.url.to_string();
            self.calls
                .lock()
                .unwrap()
                .push((url.clone(), request.credentials.is_some()));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match self.next_reply(&url) {
                Reply::Body { content_type, body } => {
                    if body.len() > request.max_size {
                        return Err(FetchFailure::TooLarge {
                            limit: request.max_size,
                        });
                    }
                    Ok(RawResponse { content_type, body })
                }
                Reply::Fail(failure) => Err(failure),
            }
        })
    }
}
