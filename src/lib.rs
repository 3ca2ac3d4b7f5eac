//! Where's My Value: a domain-scoped crawler that finds values on web pages
//!
//! This crate crawls pages reachable from a start URL on the same host and
//! searches each one for caller-supplied values by text content, element id,
//! CSS class and attribute, reporting where every match was found.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod search;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Only configuration and client construction failures surface through this
/// type once a crawl is requested; everything that happens after seeding is
/// recovered locally and aggregated into the run statistics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("History error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Robots.txt error: {0}")]
    Robots(#[from] RobotsLoadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// A page could not be retrieved
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Error fetching {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Error fetching {url}: request timed out")]
    Timeout { url: String },

    #[error("Error fetching {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was sent to
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Timeout { url } | Self::Transport { url, .. } => url,
        }
    }
}

/// A fetched page could not be treated as HTML
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Not an HTML document at {url}: {content_type}")]
    NotHtml { url: String, content_type: String },
}

/// History file read/write failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access history file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed history file {path}: {source}")]
    Format {
        path: String,
        source: serde_json::Error,
    },
}

/// robots.txt could not be loaded; robots checking is disabled for the run
#[derive(Debug, Error)]
pub enum RobotsLoadError {
    #[error("Failed to request {url}: {message}")]
    Request { url: String, message: String },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, StopHandle, WebCrawler};
pub use output::{CrawlReport, CrawlSummary, MatchRecord, TerminationReason};
pub use search::{SearchCriterion, SearchKind};
pub use state::CrawlPhase;
