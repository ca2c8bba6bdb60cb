//! HTTP client for fetching resolved document URLs to disk.
//!
//! This module provides the `DownloadClient` struct which handles streaming
//! downloads with timeout configuration, retry-with-backoff, and a one-shot
//! browser User-Agent fallback for servers that reject tool traffic with 403.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, USER_AGENT};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use super::filename::{filename_from_url, parse_content_disposition, sanitize_filename};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Connect timeout for all fetch requests, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for all fetch requests, in seconds. Large scanned documents
/// on slow publisher mirrors need the headroom.
const READ_TIMEOUT_SECS: u64 = 300;

/// Browser User-Agent used as fallback when servers return 403.
///
/// The client sends a default User-Agent identifying the tool on the first
/// attempt. If the server responds with 403 (e.g. bot-detection), the fetch
/// loop retries once with this browser-like User-Agent before giving up.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP client for downloading documents with streaming support.
///
/// The client is created once and reused for every fetch, taking advantage
/// of connection pooling and a shared cookie store. Publisher sites that
/// bounce through session redirects need the cookies to survive the hop.
///
/// # Example
///
/// ```no_run
/// use paperharvest_core::download::DownloadClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DownloadClient::new();
/// let saved = client
///     .fetch_document("https://example.com/file.pdf", Path::new("./pdf/reef"), None)
///     .await?;
/// println!("Saved to: {}", saved.path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: Client,
    retry: RetryPolicy,
}

/// A document persisted to disk by [`DownloadClient::fetch_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    /// Final path of the saved file.
    pub path: PathBuf,
    /// Number of body bytes written.
    pub bytes: u64,
}

impl Default for DownloadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadClient {
    /// Creates a new download client with default timeouts and retry policy.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    /// - In-memory cookie store: enabled
    /// - Retry policy: [`RetryPolicy::http`]
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new download client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            retry: RetryPolicy::http(),
        }
    }

    /// Replaces the retry policy, consuming and returning the client.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Downloads a document from `url` into `output_dir`.
    ///
    /// The filename is determined by:
    /// 1. `preferred_filename` (sanitized), when the caller supplies one
    /// 2. Content-Disposition header (if present)
    /// 3. URL path (last segment, with `.pdf` appended when missing)
    /// 4. Timestamp-based fallback
    ///
    /// An existing file at the resolved path is overwritten; re-fetching the
    /// same document replaces the previous copy rather than accumulating
    /// numbered duplicates.
    ///
    /// Transient failures (timeouts, connection errors, 408/429/5xx) are
    /// retried with backoff per the configured [`RetryPolicy`]. A 403 under
    /// the default User-Agent triggers one immediate re-request with
    /// [`BROWSER_USER_AGENT`] before the error is classified at all; a 403
    /// that survives the switch is permanent.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request keeps failing after all retry attempts
    /// - The server returns a non-success status (4xx, 5xx)
    /// - Creating the output directory or writing the file fails
    #[must_use = "download result contains the path to the saved document"]
    #[instrument(skip(self, preferred_filename), fields(url = %url))]
    pub async fn fetch_document(
        &self,
        url: &str,
        output_dir: &Path,
        preferred_filename: Option<&str>,
    ) -> Result<SavedDocument, DownloadError> {
        debug!("starting download");

        // Validate URL before touching the filesystem or network.
        let parsed_url =
            Url::parse(url).map_err(|_| DownloadError::invalid_url(url.to_string()))?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| DownloadError::io(output_dir.to_path_buf(), e))?;

        let mut attempt: u32 = 1;
        let mut browser_ua = false;
        loop {
            let outcome = self
                .fetch_once(url, &parsed_url, output_dir, preferred_filename, browser_ua)
                .await;
            let error = match outcome {
                Ok(saved) => return Ok(saved),
                Err(error) => error,
            };

            // One-shot User-Agent switch, outside retry accounting: a 403
            // against the default tool identity usually means bot filtering,
            // and re-requesting as a browser resolves it without any wait.
            if !browser_ua && matches!(error, DownloadError::HttpStatus { status: 403, .. }) {
                warn!("server refused default User-Agent (403), retrying with browser User-Agent");
                browser_ua = true;
                continue;
            }

            let failure_type = classify_error(&error);
            match self.retry.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "download attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, reason = %reason, "giving up on download");
                    return Err(error);
                }
            }
        }
    }

    /// Single GET-and-stream pass shared by every retry attempt.
    async fn fetch_once(
        &self,
        url: &str,
        parsed_url: &Url,
        output_dir: &Path,
        preferred_filename: Option<&str>,
        browser_ua: bool,
    ) -> Result<SavedDocument, DownloadError> {
        let mut request = self.client.get(url);
        if browser_ua {
            request = request.header(USER_AGENT, BROWSER_USER_AGENT);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file_name = choose_filename(preferred_filename, &response, parsed_url);
        let file_path = output_dir.join(&file_name);
        debug!(filename = %file_name, path = %file_path.display(), "resolved output path");

        // Create/truncate: a re-fetch of the same document overwrites the
        // previous copy instead of stacking `name(1).pdf` duplicates.
        let mut file = File::create(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;

        // Stream response body to file, with cleanup on error
        let stream_result = stream_to_file(&mut file, response, url, &file_path).await;

        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }

        let bytes = stream_result?;

        info!(
            path = %file_path.display(),
            bytes,
            "download complete"
        );

        Ok(SavedDocument {
            path: file_path,
            bytes,
        })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Picks the output filename: caller preference, then Content-Disposition
/// header, then URL path, then a timestamp fallback.
fn choose_filename(
    preferred_filename: Option<&str>,
    response: &reqwest::Response,
    url: &Url,
) -> String {
    if let Some(name) = preferred_filename
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
    {
        return name;
    }

    if let Some(cd) = response.headers().get(CONTENT_DISPOSITION)
        && let Ok(cd_str) = cd.to_str()
        && let Some(filename) = parse_content_disposition(cd_str)
    {
        let name = sanitize_filename(&filename);
        if !name.is_empty() {
            return name;
        }
    }

    if let Some(name) = filename_from_url(url.as_str()) {
        return name;
    }

    // Ultimate fallback: timestamp-based name
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("download_{timestamp}.pdf")
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::download::retry::DEFAULT_MAX_RETRIES;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn quick_client() -> DownloadClient {
        DownloadClient::new().with_retry_policy(RetryPolicy::no_delay(DEFAULT_MAX_RETRIES))
    }

    // ==================== Fetch Tests ====================

    #[tokio::test]
    async fn test_fetch_document_saves_response_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/docs/reef-study.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 reef study"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/docs/reef-study.pdf", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(saved.path, temp_dir.path().join("reef-study.pdf"));
        assert_eq!(saved.bytes, b"%PDF-1.4 reef study".len() as u64);
        let contents = std::fs::read(&saved.path).unwrap();
        assert_eq!(contents, b"%PDF-1.4 reef study");
    }

    #[tokio::test]
    async fn test_fetch_document_creates_missing_output_dir() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("pdf").join("baltic wrecks");

        Mock::given(method("GET"))
            .and(path("/a.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data"))
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/a.pdf", mock_server.uri());
        let saved = client.fetch_document(&url, &nested, None).await.unwrap();

        assert!(nested.is_dir());
        assert_eq!(saved.path, nested.join("a.pdf"));
    }

    #[tokio::test]
    async fn test_fetch_document_overwrites_existing_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("report.pdf"), b"stale copy").unwrap();

        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh copy"))
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/report.pdf", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(saved.path, temp_dir.path().join("report.pdf"));
        let contents = std::fs::read(&saved.path).unwrap();
        assert_eq!(contents, b"fresh copy", "re-fetch must replace the old file");
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no numbered duplicate may appear");
    }

    // ==================== Filename Selection Tests ====================

    #[tokio::test]
    async fn test_fetch_document_prefers_caller_supplied_filename() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/pii/S0025326X21001234"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", "attachment; filename=\"server.pdf\"")
                    .set_body_bytes(b"pdf bytes"),
            )
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/pii/S0025326X21001234", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), Some("baltic wreck survey.pdf"))
            .await
            .unwrap();

        assert_eq!(
            saved.path,
            temp_dir.path().join("baltic_wreck_survey.pdf"),
            "caller preference wins over Content-Disposition"
        );
    }

    #[tokio::test]
    async fn test_fetch_document_uses_content_disposition_name() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Content-Disposition",
                        "attachment; filename=\"survey 2019.pdf\"",
                    )
                    .set_body_bytes(b"pdf bytes"),
            )
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/download", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(saved.path, temp_dir.path().join("survey_2019.pdf"));
    }

    #[tokio::test]
    async fn test_fetch_document_appends_pdf_to_extensionless_url_name() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/view/article123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pdf bytes"))
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/view/article123", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(saved.path, temp_dir.path().join("article123.pdf"));
    }

    #[tokio::test]
    async fn test_fetch_document_rejects_invalid_url() {
        let temp_dir = TempDir::new().unwrap();
        let client = DownloadClient::new();

        let result = client
            .fetch_document("not a url at all", temp_dir.path(), None)
            .await;

        match result {
            Err(DownloadError::InvalidUrl { .. }) => {}
            other => panic!("Expected InvalidUrl, got: {other:?}"),
        }
    }

    // ==================== Retry Tests ====================

    #[tokio::test]
    async fn test_fetch_document_does_not_retry_404() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/gone.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = quick_client();
        let url = format!("{}/gone.pdf", mock_server.uri());
        let result = client.fetch_document(&url, temp_dir.path(), None).await;

        match result {
            Err(DownloadError::HttpStatus { status: 404, .. }) => {}
            other => panic!("Expected HttpStatus 404, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_document_retries_transient_503() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        // First request returns 503 (transient), second returns 200 (success)
        Mock::given(method("GET"))
            .and(path("/flaky.pdf"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1) // Matches exactly once, then falls through
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/flaky.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = quick_client();
        let url = format!("{}/flaky.pdf", mock_server.uri());
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        let contents = std::fs::read(&saved.path).unwrap();
        assert_eq!(contents, b"recovered");
    }

    #[tokio::test]
    async fn test_fetch_document_gives_up_after_max_attempts() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/always-busy.pdf"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new().with_retry_policy(RetryPolicy::no_delay(3));
        let url = format!("{}/always-busy.pdf", mock_server.uri());
        let result = client.fetch_document(&url, temp_dir.path(), None).await;

        match result {
            Err(DownloadError::HttpStatus { status: 503, .. }) => {}
            other => panic!("Expected HttpStatus 503, got: {other:?}"),
        }
    }

    // ==================== User-Agent Tests ====================

    #[tokio::test]
    async fn test_fetch_document_falls_back_to_browser_user_agent_on_403() {
        use wiremock::{Match, Request};

        /// Matches requests whose User-Agent contains "Chrome".
        struct BrowserUaMatcher;

        impl Match for BrowserUaMatcher {
            fn matches(&self, request: &Request) -> bool {
                request
                    .headers
                    .get("User-Agent")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ua| ua.contains("Chrome"))
            }
        }

        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        // Return 200 for requests WITH the browser User-Agent (higher priority)
        Mock::given(method("GET"))
            .and(path("/protected.pdf"))
            .and(BrowserUaMatcher)
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"secret content"))
            .with_priority(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        // Return 403 for all other requests (lower priority = fallback)
        Mock::given(method("GET"))
            .and(path("/protected.pdf"))
            .respond_with(ResponseTemplate::new(403))
            .with_priority(u8::MAX)
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = quick_client();
        let url = format!("{}/protected.pdf", mock_server.uri());

        // One call: 403 under the default UA, then an automatic browser-UA
        // re-request that succeeds.
        let saved = client
            .fetch_document(&url, temp_dir.path(), None)
            .await
            .unwrap();

        let contents = std::fs::read(&saved.path).unwrap();
        assert_eq!(contents, b"secret content");
    }

    #[tokio::test]
    async fn test_fetch_document_403_under_browser_user_agent_is_permanent() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        // 403 no matter which User-Agent arrives: exactly two requests, the
        // original and the one-shot browser-UA fallback. No backoff retries
        // follow because 403 classifies as permanent.
        Mock::given(method("GET"))
            .and(path("/forbidden.pdf"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = quick_client();
        let url = format!("{}/forbidden.pdf", mock_server.uri());
        let result = client.fetch_document(&url, temp_dir.path(), None).await;

        match result {
            Err(DownloadError::HttpStatus { status: 403, .. }) => {}
            other => panic!("Expected HttpStatus 403, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_document_sends_default_user_agent() {
        use wiremock::{Match, Request};

        /// Matches the first request only: User-Agent must be the default identity UA
        /// (tool name + version, no Chrome). This test issues a single GET with no 403/retry.
        struct DefaultUaMatcher;

        impl Match for DefaultUaMatcher {
            fn matches(&self, request: &Request) -> bool {
                request
                    .headers
                    .get("User-Agent")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ua| {
                        ua.contains("paperharvest")
                            && ua.contains(env!("CARGO_PKG_VERSION"))
                            && !ua.contains("Chrome")
                    })
            }
        }

        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/default-ua.pdf"))
            .and(DefaultUaMatcher)
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new();
        let url = format!("{}/default-ua.pdf", mock_server.uri());
        let result = client.fetch_document(&url, temp_dir.path(), None).await;
        assert!(
            result.is_ok(),
            "Default client must send identity User-Agent; got: {result:?}"
        );
    }

    // ==================== Error Cleanup Tests ====================

    #[tokio::test]
    async fn test_fetch_document_cleans_up_partial_file_on_stream_error() {
        // Regression: partial file must be removed when the stream fails
        // (e.g. read timeout mid-body).
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"data")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = DownloadClient::new_with_timeouts(30, 1)
            .with_retry_policy(RetryPolicy::no_delay(1));
        let url = format!("{}/slow.pdf", mock_server.uri());
        let result = client.fetch_document(&url, temp_dir.path(), None).await;
        assert!(result.is_err(), "expected timeout or network error");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(
            entries.is_empty(),
            "Partial file must be cleaned up after stream error, found: {entries:?}"
        );
    }
}
