//! Configuration module for LightCrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lightcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lightcrawl.toml")).unwrap();
//! println!("OCR batch size: {}", config.ocr.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HostRateEntry, MiningConfig, OcrConfig, OutputConfig, ProxyConfig,
    ProxyEntry, RateLimitConfig, RobotsConfig, SitemapConfig, UserAgentConfig, MIN_RATE_RPS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
