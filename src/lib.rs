//! LightCrawl: a policy-aware crawl orchestrator
//!
//! This crate sequences robots.txt compliance, per-host rate limiting and proxy
//! rotation in front of remote extraction engines (structural mining and OCR),
//! aggregating their partial results into a single [`CrawlResult`]. A companion
//! sitemap walker discovers seed URLs for later crawls.

pub mod config;
pub mod crawler;
pub mod engines;
pub mod output;
pub mod proxy;
pub mod robots;
pub mod sitemap;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for LightCrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("disallowed by robots.txt")]
    RobotsDenied { url: String },

    #[error("Invalid rate limit for host {host}: {rate} requests/sec")]
    InvalidRate { host: String, rate: f64 },

    #[error("{engine} engine error: {message}")]
    Engine { engine: &'static str, message: String },

    #[error("Sitemap parse error for {url}: {message}")]
    SitemapParse { url: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

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

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for LightCrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlContext, CrawlEvent, CrawlOptions, CrawlRequest, CrawlResult, Orchestrator};
pub use proxy::{ProxyPool, ProxyRecord, ProxyStats};
pub use robots::{RobotsDecision, RobotsGateway};
pub use sitemap::{SchemaRelationship, SeedUrl, SitemapWalker};
pub use crate::url::{extract_host, normalize_url, origin_key};
