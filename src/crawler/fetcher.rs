//! Page fetching
//!
//! This module handles:
//! - The `PageFetcher` interface shared by the static and rendered backends
//! - Building the HTTP client with the configured user agent
//! - The static (plain HTTP) backend
//! - Retry with bounded exponential backoff
//! - Error classification

use crate::config::{BackendKind, Config, RetryConfig, UserAgentConfig};
use crate::output::{DiagnosticRecord, DiagnosticSink};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// What the render engine saw, beyond the serialized HTML
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedSnapshot {
    /// `href` of every anchor in the live DOM after rendering
    pub dom_links: Vec<String>,
    /// Raw result of the in-page link walking script
    pub script_result: Option<Value>,
}

/// A fetched page, as handed to the extractors
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    /// The URL that was requested
    pub requested_url: Url,
    /// URL after redirects; relative references resolve against it
    pub final_url: Url,
    /// HTTP status, when the backend exposes one
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Body (static) or serialized DOM (rendered)
    pub content: String,
    pub reachable: bool,
    pub elapsed: Duration,
    /// Present only for the rendered backend
    pub rendered: Option<RenderedSnapshot>,
}

impl PageFetchResult {
    pub fn content_size(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the page should go through link extraction
    ///
    /// A missing Content-Type is treated as HTML.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => true,
        }
    }
}

/// Errors from a single fetch attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl FetchError {
    /// Returns true if another attempt may succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | Timeout | yes |
    /// | Connection failure | yes |
    /// | HTTP 5xx, 429 | yes |
    /// | Other HTTP status | no |
    /// | Body/transport error | yes |
    /// | Render error | yes |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(code) => *code >= 500 || *code == StatusCode::TOO_MANY_REQUESTS.as_u16(),
            _ => true,
        }
    }

    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            Self::Timeout(timeout)
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// A page fetch backend
///
/// The coordinator only talks to this interface, so it does not know whether
/// pages come from a plain HTTP client or a headless browser.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Which backend this is
    fn backend(&self) -> BackendKind;

    /// Fetches one page
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<PageFetchResult, FetchError>;

    /// Releases backend resources
    async fn close(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed (up to reqwest's default of 10 hops); the final
/// URL is read from the response.
///
/// # Example
///
/// ```no_run
/// use site_discovery::config::UserAgentConfig;
/// use site_discovery::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP backend: the page is the response body
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.crawl.page_timeout_ms);
        Ok(Self {
            client: build_http_client(&config.user_agent, timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    fn backend(&self) -> BackendKind {
        BackendKind::Static
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<PageFetchResult, FetchError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut page = PageFetchResult {
            requested_url: url.clone(),
            final_url,
            status: Some(status.as_u16()),
            content_type,
            content: String::new(),
            reachable: true,
            elapsed: Duration::ZERO,
            rendered: None,
        };

        // Non-HTML bodies are never parsed, so they are not downloaded
        if page.is_html() {
            page.content = response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(e, timeout))?;
        }

        page.elapsed = started.elapsed();
        Ok(page)
    }
}

/// Delay before retry number `attempt` (0-based)
///
/// `min(base * 2^attempt, max)`
pub fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    let delay = retry.base_delay_ms.saturating_mul(factor).min(retry.max_delay_ms);
    Duration::from_millis(delay)
}

/// Result of a fetch including its retries
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: Result<PageFetchResult, FetchError>,
    /// Attempts that failed, including the last one on failure
    pub failed_attempts: u32,
}

/// Fetches a page, retrying transient failures
///
/// Each attempt is bounded by `timeout`. Retryable errors are retried up to
/// `max-retries` times with exponential backoff; every failed attempt is
/// reported to the sink.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &Url,
    timeout: Duration,
    retry: &RetryConfig,
    sink: &dyn DiagnosticSink,
) -> FetchOutcome {
    let mut failed_attempts = 0;

    loop {
        let attempt = match tokio::time::timeout(timeout, fetcher.fetch(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match attempt {
            Ok(page) => {
                return FetchOutcome {
                    result: Ok(page),
                    failed_attempts,
                }
            }
            Err(e) => {
                let will_retry = e.is_retryable() && failed_attempts < retry.max_retries;
                sink.record(DiagnosticRecord::FetchFailed {
                    page: url.clone(),
                    attempt: failed_attempts + 1,
                    error: e.to_string(),
                    will_retry,
                });

                if !will_retry {
                    return FetchOutcome {
                        result: Err(e),
                        failed_attempts: failed_attempts + 1,
                    };
                }

                tokio::time::sleep(backoff_delay(retry, failed_attempts)).await;
                failed_attempts += 1;
            }
        }
    }
}
