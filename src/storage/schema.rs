//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the LightCrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Accumulated usage counters, one row per proxy
CREATE TABLE IF NOT EXISTS proxy_stats (
    proxy_id TEXT PRIMARY KEY,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    total_latency_ms INTEGER NOT NULL DEFAULT 0,
    last_used_at TEXT
);

-- One row per orchestrated crawl
CREATE TABLE IF NOT EXISTS crawl_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    success INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL,
    proxy_id TEXT,
    errors TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_log_url ON crawl_log(url);
CREATE INDEX IF NOT EXISTS idx_crawl_log_success ON crawl_log(success);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
