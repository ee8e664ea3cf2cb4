//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlResult;
use crate::proxy::ProxyStats;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::CrawlLogRecord;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) a database file and applies the schema
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl Storage for SqliteStorage {
    // ===== Proxy Statistics =====

    fn record_proxy_usage(
        &mut self,
        proxy_id: &str,
        success: bool,
        duration_ms: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let (successes, failures) = if success { (1i64, 0i64) } else { (0i64, 1i64) };

        self.conn.execute(
            "INSERT INTO proxy_stats (proxy_id, success_count, failure_count, total_latency_ms, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(proxy_id) DO UPDATE SET
                success_count = success_count + excluded.success_count,
                failure_count = failure_count + excluded.failure_count,
                total_latency_ms = total_latency_ms + excluded.total_latency_ms,
                last_used_at = excluded.last_used_at",
            params![proxy_id, successes, failures, duration_ms as i64, now],
        )?;
        Ok(())
    }

    fn load_proxy_stats(&self) -> StorageResult<HashMap<String, ProxyStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT proxy_id, success_count, failure_count, total_latency_ms, last_used_at
             FROM proxy_stats",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let stats = ProxyStats {
                success_count: row.get::<_, i64>(1)? as u64,
                failure_count: row.get::<_, i64>(2)? as u64,
                total_latency_ms: row.get::<_, i64>(3)? as u64,
                last_used_at: parse_timestamp(row.get(4)?),
            };
            Ok((id, stats))
        })?;

        let mut stats = HashMap::new();
        for row in rows {
            let (id, entry) = row?;
            stats.insert(id, entry);
        }
        Ok(stats)
    }

    // ===== Crawl Log =====

    fn record_crawl(&mut self, result: &CrawlResult) -> StorageResult<i64> {
        let errors = serde_json::to_string(&result.errors)?;

        self.conn.execute(
            "INSERT INTO crawl_log (url, crawled_at, success, duration_ms, proxy_id, errors)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.url.as_str(),
                result.timestamp.to_rfc3339(),
                result.success,
                result.metadata.duration_ms as i64,
                result.metadata.proxy_id,
                errors
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn recent_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlLogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, crawled_at, success, duration_ms, proxy_id, errors
             FROM crawl_log ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                CrawlLogRecord {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    crawled_at: row.get(2)?,
                    success: row.get(3)?,
                    duration_ms: row.get::<_, i64>(4)? as u64,
                    proxy_id: row.get(5)?,
                    errors: Vec::new(),
                },
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, errors) = row?;
            record.errors = serde_json::from_str(&errors)?;
            records.push(record);
        }
        Ok(records)
    }

    fn count_crawls(&self, success: Option<bool>) -> StorageResult<u64> {
        let count: i64 = match success {
            Some(flag) => self.conn.query_row(
                "SELECT COUNT(*) FROM crawl_log WHERE success = ?1",
                params![flag],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM crawl_log", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }
}
