//! Robots.txt policy gateway
//!
//! This module fetches, parses, and caches robots.txt files and turns them into
//! a [`RobotsDecision`] for each crawl target. Fetch failures (server errors,
//! network errors, timeouts) fail open: the URL is treated as allowed with no
//! crawl delay, so a robots endpoint outage never blanket-denies crawling.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::config::RobotsConfig;
use crate::url::origin_key;
use crate::{CrawlError, UrlError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// Outcome of a robots.txt check for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsDecision {
    pub allowed: bool,
    pub crawl_delay_ms: u64,
}

impl RobotsDecision {
    /// The fail-open decision: allowed, no delay
    pub fn allow() -> Self {
        Self {
            allowed: true,
            crawl_delay_ms: 0,
        }
    }
}

/// Source of access decisions consulted before every crawl
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Resolves the robots decision for `url`
    ///
    /// Returns `Err` only when no decision can be derived at all (e.g. the URL
    /// has no host); fetch problems resolve to [`RobotsDecision::allow`].
    async fn check_access(&self, url: &Url) -> Result<RobotsDecision, CrawlError>;
}

/// Robots.txt gateway with a per-origin cache
pub struct RobotsGateway {
    client: Client,
    product_token: String,
    ttl: chrono::Duration,
    fetch_timeout: Duration,
    max_crawl_delay_ms: u64,
    cache: RwLock<HashMap<String, CachedRobots>>,
}

impl RobotsGateway {
    /// Creates a gateway
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt fetches (direct, no proxy)
    /// * `config` - Cache TTL, fetch timeout and crawl delay cap
    /// * `product_token` - The crawler name matched against `User-agent` groups
    pub fn new(client: Client, config: &RobotsConfig, product_token: impl Into<String>) -> Self {
        Self {
            client,
            product_token: product_token.into(),
            ttl: chrono::Duration::seconds(config.cache_ttl_secs as i64),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_crawl_delay_ms: config.max_crawl_delay_ms,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of origins currently cached
    pub fn cached_origins(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops the cached entry for an origin, forcing a refetch on next check
    pub fn invalidate(&self, origin: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(origin);
    }

    fn cached(&self, origin: &str) -> Option<ParsedRobots> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(origin)
            .filter(|entry| !entry.is_stale(self.ttl))
            .map(|entry| entry.content.clone())
    }

    /// Evaluates `robots` for `url`, capping the crawl delay
    fn decide(&self, robots: &ParsedRobots, url: &Url) -> RobotsDecision {
        let mut decision = robots.decision(url.as_str(), &self.product_token);
        if decision.crawl_delay_ms > self.max_crawl_delay_ms {
            tracing::warn!(
                url = %url,
                requested_ms = decision.crawl_delay_ms,
                cap_ms = self.max_crawl_delay_ms,
                "Crawl-delay exceeds cap"
            );
            decision.crawl_delay_ms = self.max_crawl_delay_ms;
        }
        decision
    }

    fn store(&self, origin: String, robots: ParsedRobots) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin, CachedRobots::new(robots));
    }
}

#[async_trait]
impl AccessPolicy for RobotsGateway {
    async fn check_access(&self, url: &Url) -> Result<RobotsDecision, CrawlError> {
        let origin = origin_key(url).ok_or(CrawlError::UrlError(UrlError::MissingHost))?;

        if let Some(robots) = self.cached(&origin) {
            tracing::trace!("Using cached robots.txt for {}", origin);
            return Ok(self.decide(&robots, url));
        }

        tracing::debug!("Fetching robots.txt for {}", origin);
        match fetch_robots(&self.client, &origin, self.fetch_timeout).await {
            Ok(robots) => {
                let decision = self.decide(&robots, url);
                self.store(origin, robots);
                Ok(decision)
            }
            Err(e) => {
                tracing::warn!("robots.txt unavailable for {} ({}), failing open", origin, e);
                Ok(RobotsDecision::allow())
            }
        }
    }
}

/// Fetches robots.txt for an origin
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - 2xx parsed content, or allow-all when the site
///   answers 4xx (no policy published)
/// * `Err(CrawlError)` - 5xx status, network error, or timeout
pub async fn fetch_robots(
    client: &Client,
    origin: &str,
    timeout: Duration,
) -> Result<ParsedRobots, CrawlError> {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let request = async {
        let response = client
            .get(&robots_url)
            .send()
            .await
            .map_err(|source| CrawlError::Http {
                url: robots_url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(|source| CrawlError::Http {
                url: robots_url.clone(),
                source,
            })?;
            Ok(ParsedRobots::from_content(&body))
        } else if status.is_client_error() {
            Ok(ParsedRobots::allow_all())
        } else {
            Err(CrawlError::Status {
                url: robots_url.clone(),
                status: status.as_u16(),
            })
        }
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(CrawlError::Timeout { url: robots_url }),
    }
}
