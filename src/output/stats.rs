//! Statistics from the orchestrator database
//!
//! This module provides functionality for extracting and displaying
//! proxy usage and crawl log statistics from the storage layer.

use crate::proxy::ProxyStats;
use crate::storage::{CrawlLogRecord, Storage};
use crate::CrawlError;

/// Number of crawl log entries shown by [`print_statistics`]
const RECENT_CRAWLS: usize = 10;

/// Orchestrator statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of logged crawls
    pub total_crawls: u64,

    /// Crawls whose pipeline completed
    pub successful_crawls: u64,

    /// Crawls stopped by robots.txt or a policy failure
    pub failed_crawls: u64,

    /// Per-proxy usage counters, sorted by proxy id
    pub proxies: Vec<(String, ProxyStats)>,

    /// Most recent crawl log entries, newest first
    pub recent: Vec<CrawlLogRecord>,
}

impl CrawlStatistics {
    /// Fraction of successful crawls, 0 when nothing was logged
    pub fn success_rate(&self) -> f64 {
        match self.total_crawls {
            0 => 0.0,
            n => self.successful_crawls as f64 / n as f64,
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CrawlError> {
    let total_crawls = storage.count_crawls(None)?;
    let successful_crawls = storage.count_crawls(Some(true))?;
    let failed_crawls = storage.count_crawls(Some(false))?;

    let mut proxies: Vec<_> = storage.load_proxy_stats()?.into_iter().collect();
    proxies.sort_by(|a, b| a.0.cmp(&b.0));

    let recent = storage.recent_crawls(RECENT_CRAWLS)?;

    Ok(CrawlStatistics {
        total_crawls,
        successful_crawls,
        failed_crawls,
        proxies,
        recent,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Orchestrator Statistics ===\n");

    println!("Crawls:");
    println!("  Total: {}", stats.total_crawls);
    println!("  Completed: {}", stats.successful_crawls);
    println!("  Stopped: {}", stats.failed_crawls);
    println!("  Success Rate: {:.1}%", stats.success_rate() * 100.0);
    println!();

    if !stats.proxies.is_empty() {
        println!("Proxies ({}):", stats.proxies.len());
        for (id, proxy) in &stats.proxies {
            let last_used = proxy
                .last_used_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {}: {} ok / {} failed ({:.1}%), avg {:.0}ms, last used {}",
                id,
                proxy.success_count,
                proxy.failure_count,
                proxy.success_rate() * 100.0,
                proxy.average_latency_ms(),
                last_used
            );
        }
        println!();
    }

    if !stats.recent.is_empty() {
        println!("Recent Crawls:");
        for record in &stats.recent {
            let status = if record.success { "ok" } else { "stopped" };
            println!(
                "  [{}] {} {} ({}ms, proxy {})",
                record.crawled_at,
                status,
                record.url,
                record.duration_ms,
                record.proxy_id.as_deref().unwrap_or("-")
            );
            for error in &record.errors {
                println!("      {}: {}", error.service, error.error);
            }
        }
    }
}
