//! Egress proxy pool
//!
//! Holds the configured proxies, hands them out round-robin, and accumulates
//! per-proxy usage statistics. Safe for concurrent use: the rotation cursor is
//! atomic and statistics are updated under a mutex, so concurrent
//! `record_usage` calls never lose an increment.

mod stats;

pub use stats::ProxyStats;

use crate::config::ProxyConfig;
use crate::storage::{SharedStorage, Storage};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Transport protocol spoken by a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "socks5" => Some(Self::Socks5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered egress proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
}

impl ProxyRecord {
    /// Proxy URL understood by the HTTP client, e.g. `socks5://10.0.0.2:1080`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Round-robin proxy pool with usage statistics
pub struct ProxyPool {
    enabled: bool,
    proxies: Vec<ProxyRecord>,
    cursor: AtomicUsize,
    stats: Mutex<HashMap<String, ProxyStats>>,
    storage: Option<SharedStorage>,
}

impl ProxyPool {
    /// Creates a pool over `proxies`; a disabled pool never hands out a proxy
    pub fn new(enabled: bool, proxies: Vec<ProxyRecord>) -> Self {
        let stats = proxies
            .iter()
            .map(|p| (p.id.clone(), ProxyStats::default()))
            .collect();

        Self {
            enabled,
            proxies,
            cursor: AtomicUsize::new(0),
            stats: Mutex::new(stats),
            storage: None,
        }
    }

    /// A pool that always answers "direct connection"
    pub fn disabled() -> Self {
        Self::new(false, Vec::new())
    }

    /// Builds the pool from the `[proxy]` configuration section
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let proxies = config
            .servers
            .iter()
            .map(|entry| {
                let protocol = ProxyProtocol::parse(&entry.protocol).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "proxy '{}' uses unsupported protocol '{}'",
                        entry.id, entry.protocol
                    ))
                })?;
                Ok(ProxyRecord {
                    id: entry.id.clone(),
                    host: entry.host.clone(),
                    port: entry.port,
                    protocol,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self::new(config.enabled, proxies))
    }

    /// Attaches persistent storage
    ///
    /// Previously recorded statistics for registered proxies are loaded, and
    /// every later `record_usage` is also written through.
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        let loaded = {
            let guard = storage.lock().unwrap_or_else(PoisonError::into_inner);
            guard.load_proxy_stats()
        };

        match loaded {
            Ok(persisted) => {
                let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
                for (id, entry) in persisted {
                    if let Some(current) = stats.get_mut(&id) {
                        *current = entry;
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to load persisted proxy stats: {}", e),
        }

        self.storage = Some(storage);
        self
    }

    /// Returns the next proxy in rotation, or `None` for a direct connection
    pub fn next(&self) -> Option<ProxyRecord> {
        if !self.enabled || self.proxies.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[index].clone())
    }

    /// Records the outcome of a crawl that went through `proxy_id`
    ///
    /// Unknown ids are ignored: this runs after the crawl result is final and
    /// must never mask it.
    pub fn record_usage(&self, proxy_id: &str, success: bool, duration_ms: u64) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            match stats.get_mut(proxy_id) {
                Some(entry) => entry.record(success, duration_ms),
                None => {
                    tracing::debug!("Ignoring usage for unknown proxy {}", proxy_id);
                    return;
                }
            }
        }

        if let Some(storage) = &self.storage {
            let mut guard = storage.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = guard.record_proxy_usage(proxy_id, success, duration_ms) {
                tracing::warn!("Failed to persist usage for proxy {}: {}", proxy_id, e);
            }
        }
    }

    /// Snapshot of the statistics for one proxy
    pub fn stats_for(&self, proxy_id: &str) -> Option<ProxyStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(proxy_id)
            .cloned()
    }

    /// Snapshot of all statistics
    pub fn stats(&self) -> HashMap<String, ProxyStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
