//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building the HTTP client with the fixed request header set
//! - Single-shot GET requests (no automatic retry)
//! - Error classification into [`FetchError`]
//! - Consecutive-failure tracking

use crate::state::CrawlStats;
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Number of consecutive failures after which a warning is logged
pub const CONSECUTIVE_FAILURE_WARN_THRESHOLD: u32 = 5;

const MAX_REDIRECTS: usize = 10;

/// The fixed, descriptive header set sent with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

impl RequestHeaders {
    pub const DEFAULT_ACCEPT: &'static str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
    pub const DEFAULT_ACCEPT_LANGUAGE: &'static str = "en-US,en;q=0.5";

    /// The product token robots.txt groups are matched against
    ///
    /// `WheresMyValue/0.1 (+info)` yields `WheresMyValue`.
    pub fn robots_token(&self) -> &str {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .find(|s| !s.is_empty())
            .unwrap_or("*")
    }
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "WheresMyValue/{} (domain-scoped value search crawler)",
                env!("CARGO_PKG_VERSION")
            ),
            accept: Self::DEFAULT_ACCEPT,
            accept_language: Self::DEFAULT_ACCEPT_LANGUAGE,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `headers` - The request header set
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(headers: &RequestHeaders, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static(headers.accept));
    default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(headers.accept_language));

    Client::builder()
        .user_agent(headers.user_agent.as_str())
        .default_headers(default_headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL that was requested
    pub url: Url,
    /// Final URL after redirects
    pub final_url: Url,
    pub status: u16,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    /// Whether the body should be treated as markup
    ///
    /// A missing Content-Type is given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().map_or(true, |ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("html") || ct.contains("xml")
        })
    }
}

/// Issues page requests and records failures into the run statistics
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    stats: Arc<CrawlStats>,
    consecutive_failures: AtomicU32,
}

impl Fetcher {
    pub fn new(client: Client, stats: Arc<CrawlStats>) -> Self {
        Self {
            client,
            stats,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Fetches a page with a single GET request
    ///
    /// Any non-2xx status or transport failure is returned as a
    /// [`FetchError`] after being recorded in the error log.
    pub async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        match request(&self.client, url).await {
            Ok(page) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                Ok(page)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.stats.add_error(e.to_string());

                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= CONSECUTIVE_FAILURE_WARN_THRESHOLD {
                    tracing::warn!("{} consecutive fetch failures", failures);
                }
                Err(e)
            }
        }
    }
}

async fn request(client: &Client, url: &Url) -> Result<Page, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(|e| classify(url, e))?;

    Ok(Page {
        url: url.clone(),
        final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

fn classify(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transport {
            url: url.to_string(),
            message: "connection failed".to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
