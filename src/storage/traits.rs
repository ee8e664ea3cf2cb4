//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlResult;
use crate::proxy::ProxyStats;
use crate::storage::CrawlLogRecord;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Proxy Statistics =====

    /// Adds one crawl outcome to a proxy's counters, creating the row if needed
    ///
    /// The increment happens inside the database so concurrent writers never
    /// overwrite each other's counts.
    fn record_proxy_usage(
        &mut self,
        proxy_id: &str,
        success: bool,
        duration_ms: u64,
    ) -> StorageResult<()>;

    /// Loads all persisted proxy statistics
    fn load_proxy_stats(&self) -> StorageResult<HashMap<String, ProxyStats>>;

    // ===== Crawl Log =====

    /// Appends a crawl result to the log, returning its row id
    fn record_crawl(&mut self, result: &CrawlResult) -> StorageResult<i64>;

    /// Returns the most recent crawl log entries, newest first
    fn recent_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlLogRecord>>;

    /// Counts logged crawls, optionally restricted by success flag
    fn count_crawls(&self, success: Option<bool>) -> StorageResult<u64>;
}
