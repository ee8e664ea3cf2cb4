//! Storage module for persisting orchestrator bookkeeping
//!
//! This module handles the only state the orchestrator persists:
//! - Per-proxy usage statistics
//! - A log of crawl outcomes

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::ServiceError;
use std::sync::{Arc, Mutex};

/// Storage handle shared between the proxy pool and the orchestrator
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// A crawl log row
#[derive(Debug, Clone)]
pub struct CrawlLogRecord {
    pub id: i64,
    pub url: String,
    pub crawled_at: String,
    pub success: bool,
    pub duration_ms: u64,
    pub proxy_id: Option<String>,
    pub errors: Vec<ServiceError>,
}
