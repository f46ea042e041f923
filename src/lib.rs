//! Site-Discovery: a breadth-first site crawler
//!
//! This crate discovers the reachable pages of a website starting from one or
//! more seed URLs. Every fetched page is scanned by several independent link
//! extractors whose results are fused, scoped to the accepted domains, and fed
//! back into a bounded BFS frontier.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Discovery operations
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),
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

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("At least one seed URL is required")]
    NoSeeds,

    #[error("Accepted domain set is empty")]
    EmptyDomainSet,
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Empty reference")]
    Empty,

    #[error("Fragment-only reference: {0}")]
    FragmentOnly(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Site-Discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator};
pub use output::{CrawlReport, CrawlSummary};
pub use state::{CrawlStatus, PageState};
pub use crate::url::{normalize_reference, normalize_url, AdmissionFilter};
