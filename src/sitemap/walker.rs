//! Sitemap tree walker
//!
//! Walks a sitemap and every sitemap it references, depth first. Two sets
//! live for the whole walk, one of fetched documents and one of emitted page
//! URLs: a child sitemap referenced by two parents is fetched once, a cyclic
//! index terminates, and no page URL is emitted twice. A page URL that
//! happens to equal a sitemap URL does not stop that sitemap from being
//! walked.

use crate::config::Config;
use crate::crawler::{build_http_client, ConnectionConfig, RateLimiter};
use crate::sitemap::parser::{parse_sitemap, SitemapDocument};
use crate::sitemap::{SchemaRelationship, SeedMetadata, SeedSource, SeedUrl};
use crate::url::{extract_host, normalize_url};
use crate::CrawlError;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_MAX_NODES: usize = 1_000;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SUCCESS_DECAY: f64 = 0.9;

/// Bookkeeping for one walk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkStats {
    pub nodes_fetched: usize,
    pub nodes_failed: usize,
    /// Exponentially decayed node success rate, starting at 1.0
    pub success_rate: f64,
    /// Set when the node ceiling stopped the walk early
    pub truncated: bool,
}

impl WalkStats {
    fn new() -> Self {
        Self {
            nodes_fetched: 0,
            nodes_failed: 0,
            success_rate: 1.0,
            truncated: false,
        }
    }

    fn record(&mut self, success: bool, decay: f64) {
        if success {
            self.nodes_fetched += 1;
        } else {
            self.nodes_failed += 1;
        }
        let sample = if success { 1.0 } else { 0.0 };
        self.success_rate = decay * self.success_rate + (1.0 - decay) * sample;
    }

    pub fn nodes_visited(&self) -> usize {
        self.nodes_fetched + self.nodes_failed
    }
}

/// Seeds and stats produced by one walk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkReport {
    pub seeds: Vec<SeedUrl>,
    pub stats: WalkStats,
}

/// Discovers seed URLs from sitemap trees
pub struct SitemapWalker {
    client: Client,
    service_id: String,
    max_nodes: usize,
    fetch_timeout: Duration,
    success_decay: f64,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl SitemapWalker {
    pub fn new(client: Client, service_id: impl Into<String>) -> Self {
        Self {
            client,
            service_id: service_id.into(),
            max_nodes: DEFAULT_MAX_NODES,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            success_decay: DEFAULT_SUCCESS_DECAY,
            rate_limiter: None,
        }
    }

    /// Caps the number of sitemap documents fetched per walk
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.max(1);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_success_decay(mut self, decay: f64) -> Self {
        self.success_decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Paces sitemap fetches through the shared per-host limiter
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let fetch_timeout = Duration::from_millis(config.sitemap.fetch_timeout_ms);
        let client = build_http_client(
            &ConnectionConfig::direct(config.user_agent.header_value()),
            fetch_timeout,
        )?;

        Ok(Self::new(client, config.crawler.service_id.clone())
            .with_max_nodes(config.sitemap.max_nodes)
            .with_fetch_timeout(fetch_timeout)
            .with_success_decay(config.sitemap.success_decay))
    }

    /// Walks the sitemap tree rooted at `seed` and returns matching page URLs
    pub async fn walk(&self, seed: &Url, filter: Option<&SchemaRelationship>) -> Vec<SeedUrl> {
        self.walk_with_report(seed, filter).await.seeds
    }

    /// Like [`walk`](Self::walk), also returning node statistics
    ///
    /// Never fails: a sitemap that cannot be fetched or parsed contributes no
    /// URLs and is counted in [`WalkStats::nodes_failed`].
    pub async fn walk_with_report(
        &self,
        seed: &Url,
        filter: Option<&SchemaRelationship>,
    ) -> WalkReport {
        let mut visited_documents: HashSet<String> = HashSet::new();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut seeds = Vec::new();
        let mut stats = WalkStats::new();

        // LIFO frontier; children are pushed in reverse so document order is kept
        let mut frontier: Vec<Url> = vec![seed.clone()];

        while let Some(sitemap_url) = frontier.pop() {
            let key = visit_key(&sitemap_url);
            if !visited_documents.insert(key) {
                tracing::debug!(sitemap = %sitemap_url, "Sitemap already visited");
                continue;
            }

            if stats.nodes_visited() >= self.max_nodes {
                tracing::warn!(
                    max_nodes = self.max_nodes,
                    pending = frontier.len() + 1,
                    "Sitemap node limit reached, stopping walk"
                );
                stats.truncated = true;
                break;
            }

            let document = match self.fetch_document(&sitemap_url).await {
                Ok(document) => {
                    stats.record(true, self.success_decay);
                    document
                }
                Err(e) => {
                    stats.record(false, self.success_decay);
                    tracing::warn!(
                        sitemap = %sitemap_url,
                        error = %e,
                        success_rate = stats.success_rate,
                        "Sitemap node failed"
                    );
                    continue;
                }
            };

            tracing::debug!(
                sitemap = %sitemap_url,
                entries = document.entries.len(),
                children = document.children.len(),
                "Parsed sitemap"
            );

            let collected_at = Utc::now();
            for entry in document.entries {
                if !emitted.insert(visit_key(&entry.loc)) {
                    continue;
                }

                let schema_related = match filter {
                    Some(relationship) if !relationship.matches(&entry.loc) => continue,
                    Some(_) => true,
                    None => false,
                };

                seeds.push(SeedUrl {
                    url: entry.loc,
                    priority: entry.priority,
                    source: SeedSource::Sitemap,
                    service_id: self.service_id.clone(),
                    collected_at,
                    metadata: SeedMetadata {
                        schema_related,
                        relationship: filter.filter(|_| schema_related).cloned(),
                    },
                });
            }

            frontier.extend(
                document
                    .children
                    .into_iter()
                    .rev()
                    .filter(|child| !visited_documents.contains(&visit_key(child))),
            );
        }

        tracing::info!(
            seed = %seed,
            seeds = seeds.len(),
            nodes_fetched = stats.nodes_fetched,
            nodes_failed = stats.nodes_failed,
            "Sitemap walk finished"
        );

        WalkReport { seeds, stats }
    }

    async fn fetch_document(&self, url: &Url) -> Result<SitemapDocument, CrawlError> {
        if let Some(limiter) = &self.rate_limiter {
            if let Some(host) = extract_host(url) {
                limiter.acquire(&host).await?;
            }
        }

        let body = tokio::time::timeout(self.fetch_timeout, self.fetch_body(url))
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
            })??;

        parse_sitemap(url, &body)
    }

    async fn fetch_body(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CrawlError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Visited-set key: the normalized URL, or the raw string when it does not
/// normalize
fn visit_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
