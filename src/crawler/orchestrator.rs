//! Crawl orchestration
//!
//! The orchestrator runs one crawl through a fixed pipeline:
//!
//! 1. Ask the access policy (robots.txt) whether the URL may be fetched
//! 2. Wait for the host's rate budget
//! 3. Honor the robots crawl delay
//! 4. Pick a proxy
//! 5. Run the requested engines concurrently and collect their outputs
//! 6. Record proxy usage
//! 7. Publish the result as an event
//!
//! Steps 1-4 can stop the crawl; an engine failure never does. Every request
//! produces exactly one [`CrawlResult`] and exactly one [`CrawlEvent`].

use crate::config::Config;
use crate::crawler::batch::run_batches;
use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::fetcher::{build_http_client, ConnectionConfig};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::result::{CrawlRequest, CrawlResult, Service};
use crate::engines::{
    EngineSlot, HttpMiningEngine, HttpOcrEngine, MiningEngine, MiningReport, OcrEngine,
    OcrSummary,
};
use crate::proxy::ProxyPool;
use crate::robots::{AccessPolicy, RobotsGateway};
use crate::storage::{SharedStorage, Storage};
use crate::url::extract_host;
use crate::{CrawlError, UrlError};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

const DEFAULT_MINING_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared policy components consulted by every crawl
#[derive(Clone)]
pub struct CrawlContext {
    pub robots: Arc<dyn AccessPolicy>,
    pub rate_limiter: Arc<RateLimiter>,
    pub proxies: Arc<ProxyPool>,
}

impl CrawlContext {
    pub fn new(
        robots: Arc<dyn AccessPolicy>,
        rate_limiter: Arc<RateLimiter>,
        proxies: Arc<ProxyPool>,
    ) -> Self {
        Self {
            robots,
            rate_limiter,
            proxies,
        }
    }

    /// Builds the robots gateway, rate limiter and proxy pool from config
    ///
    /// When `storage` is given, proxy statistics are loaded from and written
    /// through to it.
    pub fn from_config(config: &Config, storage: Option<SharedStorage>) -> Result<Self, CrawlError> {
        let robots_client = build_http_client(
            &ConnectionConfig::direct(config.user_agent.header_value()),
            Duration::from_millis(config.robots.fetch_timeout_ms),
        )?;
        let robots = RobotsGateway::new(
            robots_client,
            &config.robots,
            config.user_agent.crawler_name.clone(),
        );

        let mut proxies = ProxyPool::from_config(&config.proxy)?;
        if let Some(storage) = storage {
            proxies = proxies.with_storage(storage);
        }

        Ok(Self::new(
            Arc::new(robots),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            Arc::new(proxies),
        ))
    }
}

/// Sequences policy checks and engine calls for individual crawls
pub struct Orchestrator {
    context: CrawlContext,
    user_agent: String,
    mining: EngineSlot<dyn MiningEngine>,
    mining_timeout: Duration,
    ocr: EngineSlot<dyn OcrEngine>,
    ocr_timeout: Duration,
    ocr_batch_size: usize,
    events: EventBus,
    storage: Option<SharedStorage>,
}

impl Orchestrator {
    /// Creates an orchestrator with no engines attached
    pub fn new(context: CrawlContext, user_agent: impl Into<String>) -> Self {
        Self {
            context,
            user_agent: user_agent.into(),
            mining: EngineSlot::Absent,
            mining_timeout: DEFAULT_MINING_TIMEOUT,
            ocr: EngineSlot::Absent,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            ocr_batch_size: 1,
            events: EventBus::new(),
            storage: None,
        }
    }

    pub fn with_mining(mut self, engine: Arc<dyn MiningEngine>) -> Self {
        self.mining = EngineSlot::Ready(engine);
        self
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>, batch_size: usize) -> Self {
        self.ocr = EngineSlot::Ready(engine);
        self.ocr_batch_size = batch_size.max(1);
        self
    }

    /// Upper bounds for a single mining call and a single OCR item
    pub fn with_engine_timeouts(mut self, mining: Duration, ocr: Duration) -> Self {
        self.mining_timeout = mining;
        self.ocr_timeout = ocr;
        self
    }

    /// Appends every crawl result to the storage crawl log
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Builds a fully wired orchestrator from config
    ///
    /// Enabled engines are constructed and initialized here, once. A mining
    /// engine that fails to initialize is logged and left out; crawls then
    /// proceed without it.
    pub async fn from_config(
        config: &Config,
        context: CrawlContext,
        storage: Option<SharedStorage>,
    ) -> Result<Self, CrawlError> {
        let user_agent = config.user_agent.header_value();
        let mut orchestrator = Self::new(context, user_agent.clone()).with_engine_timeouts(
            Duration::from_millis(config.layers3d.timeout_ms),
            Duration::from_millis(config.ocr.timeout_ms),
        );

        if config.layers3d.enabled {
            let engine = HttpMiningEngine::from_config(&config.layers3d, &user_agent)?;
            match engine.initialize().await {
                Ok(()) => orchestrator = orchestrator.with_mining(Arc::new(engine)),
                Err(e) => {
                    tracing::warn!(error = %e, "Mining engine failed to initialize, continuing without it")
                }
            }
        }

        if config.ocr.enabled {
            let engine = HttpOcrEngine::from_config(&config.ocr, &user_agent)?;
            orchestrator = orchestrator.with_ocr(Arc::new(engine), config.ocr.batch_size);
        }

        if let Some(storage) = storage {
            orchestrator = orchestrator.with_storage(storage);
        }

        tracing::info!(
            mining = orchestrator.mining.is_ready(),
            ocr = orchestrator.ocr.is_ready(),
            proxies = orchestrator.context.proxies.len(),
            "Orchestrator ready"
        );

        Ok(orchestrator)
    }

    /// Subscribes to crawl events
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }

    pub fn context(&self) -> &CrawlContext {
        &self.context
    }

    /// Crawls one URL
    ///
    /// Never fails: policy failures come back as a result with
    /// `success == false` and a crawler error; engine failures come back as
    /// per-engine errors on an otherwise successful result.
    pub async fn crawl(&self, request: &CrawlRequest) -> CrawlResult {
        let mut result = CrawlResult::new(request.url.clone());
        result.metadata.user_agent = Some(self.user_agent.clone());

        let started = Instant::now();
        let outcome = self.run_pipeline(request, &mut result).await;
        result.metadata.duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => result.success = true,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Crawl stopped");
                result.success = false;
                result.push_error(Service::Crawler, e.to_string());
            }
        }

        if let Some(proxy_id) = result.metadata.proxy_id.as_deref() {
            self.context
                .proxies
                .record_usage(proxy_id, result.success, result.metadata.duration_ms);
        }

        self.log_result(&result);
        self.events.publish(&result);

        tracing::info!(
            url = %result.url,
            success = result.success,
            duration_ms = result.metadata.duration_ms,
            errors = result.errors.len(),
            "Crawl finished"
        );

        result
    }

    async fn run_pipeline(
        &self,
        request: &CrawlRequest,
        result: &mut CrawlResult,
    ) -> Result<(), CrawlError> {
        let decision = self.context.robots.check_access(&request.url).await?;
        if !decision.allowed {
            return Err(CrawlError::RobotsDenied {
                url: request.url.to_string(),
            });
        }

        let host = extract_host(&request.url).ok_or(UrlError::MissingHost)?;
        self.context.rate_limiter.acquire(&host).await?;

        if decision.crawl_delay_ms > 0 {
            tracing::debug!(host = %host, delay_ms = decision.crawl_delay_ms, "Honoring crawl delay");
            tokio::time::sleep(Duration::from_millis(decision.crawl_delay_ms)).await;
        }

        let connection = ConnectionConfig {
            user_agent: self.user_agent.clone(),
            proxy: self.context.proxies.next(),
        };
        result.metadata.proxy_id = connection.proxy.as_ref().map(|p| p.id.clone());

        let (mining, ocr) = tokio::join!(
            self.run_mining(request, &connection),
            self.run_ocr(request)
        );

        if let Some(outcome) = mining {
            match outcome {
                Ok(report) => {
                    result.data.structural_mining = Some(report);
                    result.metadata.has_3d_layers = Some(true);
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "Structural mining failed");
                    result.metadata.has_3d_layers = Some(false);
                    result.push_error(Service::Mining, e.to_string());
                }
            }
        }

        if let Some(outcome) = ocr {
            match outcome {
                Ok(summary) => {
                    result.data.ocr = Some(summary);
                    result.metadata.has_ocr = Some(true);
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "OCR failed");
                    result.metadata.has_ocr = Some(false);
                    result.push_error(Service::Ocr, e.to_string());
                }
            }
        }

        Ok(())
    }

    /// `None` when mining was not attempted
    async fn run_mining(
        &self,
        request: &CrawlRequest,
        connection: &ConnectionConfig,
    ) -> Option<Result<MiningReport, CrawlError>> {
        let engine = self.mining.get()?;
        if !request.options.mine_structure {
            return None;
        }

        let outcome = tokio::time::timeout(
            self.mining_timeout,
            engine.mine_url(&request.url, connection),
        )
        .await
        .unwrap_or_else(|_| {
            Err(CrawlError::Timeout {
                url: request.url.to_string(),
            })
        });

        Some(outcome)
    }

    /// `None` when OCR was not attempted
    ///
    /// Individual image failures are reported inside the summary. The engine
    /// as a whole only counts as failed when every image failed.
    async fn run_ocr(&self, request: &CrawlRequest) -> Option<Result<OcrSummary, CrawlError>> {
        let engine = self.ocr.get()?;
        if !request.options.extract_images {
            return None;
        }

        let timeout = self.ocr_timeout;
        let outcomes = run_batches(
            request.options.images.clone(),
            self.ocr_batch_size,
            |image: url::Url| {
                let engine = Arc::clone(engine);
                async move {
                    tokio::time::timeout(timeout, engine.recognize(&image))
                        .await
                        .unwrap_or_else(|_| {
                            Err(CrawlError::Timeout {
                                url: image.to_string(),
                            })
                        })
                }
            },
        )
        .await;

        let summary = OcrSummary::from_outcomes(&outcomes);
        tracing::debug!(
            url = %request.url,
            total = summary.total,
            successful = summary.successful,
            "OCR batch finished"
        );

        if summary.all_failed() {
            return Some(Err(CrawlError::Engine {
                engine: "ocr",
                message: format!(
                    "all {} image(s) failed: {}",
                    summary.total,
                    summary.first_error().unwrap_or("unknown error")
                ),
            }));
        }

        Some(Ok(summary))
    }

    fn log_result(&self, result: &CrawlResult) {
        let Some(storage) = &self.storage else {
            return;
        };

        let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = storage.record_crawl(result) {
            tracing::warn!(url = %result.url, error = %e, "Failed to log crawl result");
        }
    }

    /// Releases engine resources
    pub async fn shutdown(&self) {
        if let Some(engine) = self.mining.get() {
            engine.shutdown().await;
        }
        tracing::info!("Orchestrator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::result::CrawlOptions;
    use crate::engines::OcrText;
    use crate::proxy::{ProxyProtocol, ProxyRecord};
    use crate::robots::RobotsDecision;
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use url::Url;

    struct StaticPolicy(RobotsDecision);

    #[async_trait]
    impl AccessPolicy for StaticPolicy {
        async fn check_access(&self, _url: &Url) -> Result<RobotsDecision, CrawlError> {
            Ok(self.0)
        }
    }

    struct StubMining {
        fail: bool,
        calls: AtomicUsize,
        last_proxy: Mutex<Option<String>>,
    }

    impl StubMining {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
                last_proxy: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl MiningEngine for StubMining {
        async fn mine_url(
            &self,
            _url: &Url,
            connection: &ConnectionConfig,
        ) -> Result<MiningReport, CrawlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_proxy.lock().unwrap() = connection.proxy_url();
            if self.fail {
                Err(CrawlError::Engine {
                    engine: "3d-layers",
                    message: "mining exploded".to_string(),
                })
            } else {
                Ok(MiningReport::default())
            }
        }
    }

    /// Recognizes images whose path contains "ok"
    struct StubOcr;

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn recognize(&self, image: &Url) -> Result<OcrText, CrawlError> {
            if image.path().contains("ok") {
                Ok(OcrText {
                    text: format!("text of {}", image.path()),
                    ..OcrText::default()
                })
            } else {
                Err(CrawlError::Engine {
                    engine: "ocr",
                    message: format!("unreadable {}", image.path()),
                })
            }
        }
    }

    fn context(decision: RobotsDecision, proxies: ProxyPool) -> CrawlContext {
        CrawlContext::new(
            Arc::new(StaticPolicy(decision)),
            Arc::new(RateLimiter::unlimited()),
            Arc::new(proxies),
        )
    }

    fn proxy_pool() -> ProxyPool {
        ProxyPool::new(
            true,
            vec![ProxyRecord {
                id: "p1".to_string(),
                host: "10.0.0.1".to_string(),
                port: 8080,
                protocol: ProxyProtocol::Http,
            }],
        )
    }

    fn request(mine: bool, images: &[&str]) -> CrawlRequest {
        CrawlRequest::new(Url::parse("https://example.com/page").unwrap()).with_options(
            CrawlOptions {
                mine_structure: mine,
                extract_images: !images.is_empty(),
                images: images
                    .iter()
                    .map(|p| Url::parse(&format!("https://cdn.example.com/{}", p)).unwrap())
                    .collect(),
            },
        )
    }

    #[tokio::test]
    async fn test_no_engines_is_success() {
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua");

        let result = orchestrator.crawl(&request(true, &["ok.png"])).await;

        assert!(result.success);
        assert!(result.errors.is_empty());
        assert!(result.metadata.proxy_id.is_none());
        assert!(result.metadata.has_3d_layers.is_none());
        assert!(result.metadata.has_ocr.is_none());
        assert_eq!(result.metadata.user_agent.as_deref(), Some("ua"));
    }

    #[tokio::test]
    async fn test_robots_denial_stops_before_proxy() {
        let mining = StubMining::new(false);
        let orchestrator = Orchestrator::new(
            context(
                RobotsDecision {
                    allowed: false,
                    crawl_delay_ms: 0,
                },
                proxy_pool(),
            ),
            "ua",
        )
        .with_mining(mining.clone());
        let mut events = orchestrator.subscribe();

        let result = orchestrator.crawl(&request(true, &[])).await;

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].service, Service::Crawler);
        assert_eq!(result.errors[0].error, "disallowed by robots.txt");
        assert!(result.metadata.proxy_id.is_none());
        assert_eq!(mining.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.context().proxies.stats_for("p1").unwrap().total_uses(), 0);

        assert!(events.recv().await.unwrap().is_error());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mining_failure_is_contained() {
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), proxy_pool()), "ua")
            .with_mining(StubMining::new(true))
            .with_ocr(Arc::new(StubOcr), 2);
        let mut events = orchestrator.subscribe();

        let result = orchestrator.crawl(&request(true, &["ok-1.png"])).await;

        assert!(result.success);
        assert_eq!(result.metadata.has_3d_layers, Some(false));
        assert_eq!(result.metadata.has_ocr, Some(true));
        assert!(result.data.structural_mining.is_none());
        assert_eq!(result.data.ocr.as_ref().unwrap().text, "text of /ok-1.png");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].service, Service::Mining);
        assert!(result.errors[0].error.contains("mining exploded"));

        assert!(!events.recv().await.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_mining_receives_selected_proxy() {
        let mining = StubMining::new(false);
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), proxy_pool()), "ua")
            .with_mining(mining.clone());

        let result = orchestrator.crawl(&request(true, &[])).await;

        assert!(result.success);
        assert_eq!(result.metadata.has_3d_layers, Some(true));
        assert!(result.data.structural_mining.is_some());
        assert_eq!(result.metadata.proxy_id.as_deref(), Some("p1"));
        assert_eq!(
            mining.last_proxy.lock().unwrap().as_deref(),
            Some("http://10.0.0.1:8080")
        );

        let stats = orchestrator.context().proxies.stats_for("p1").unwrap();
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 0);
    }

    #[tokio::test]
    async fn test_mining_skipped_when_not_requested() {
        let mining = StubMining::new(false);
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua")
            .with_mining(mining.clone());

        let result = orchestrator.crawl(&request(false, &[])).await;

        assert!(result.success);
        assert!(result.metadata.has_3d_layers.is_none());
        assert_eq!(mining.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_ocr_failure() {
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua")
            .with_ocr(Arc::new(StubOcr), 2);

        let result = orchestrator
            .crawl(&request(false, &["ok-1.png", "bad.png", "ok-2.png"]))
            .await;

        assert!(result.success);
        assert!(result.errors.is_empty());
        assert_eq!(result.metadata.has_ocr, Some(true));

        let ocr = result.data.ocr.unwrap();
        assert_eq!(ocr.total, 3);
        assert_eq!(ocr.successful, 2);
        assert_eq!(ocr.failed, 1);
        assert_eq!(ocr.text, "text of /ok-1.png\ntext of /ok-2.png");
    }

    #[tokio::test]
    async fn test_all_ocr_items_failing_is_engine_failure() {
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua")
            .with_ocr(Arc::new(StubOcr), 4);

        let result = orchestrator.crawl(&request(false, &["bad-1.png", "bad-2.png"])).await;

        assert!(result.success);
        assert_eq!(result.metadata.has_ocr, Some(false));
        assert!(result.data.ocr.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].service, Service::Ocr);
    }

    #[tokio::test]
    async fn test_engine_errors_ordered_mining_then_ocr() {
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua")
            .with_mining(StubMining::new(true))
            .with_ocr(Arc::new(StubOcr), 1);

        let result = orchestrator.crawl(&request(true, &["bad.png"])).await;

        assert!(result.success);
        let services: Vec<Service> = result.errors.iter().map(|e| e.service).collect();
        assert_eq!(services, vec![Service::Mining, Service::Ocr]);
    }

    #[tokio::test]
    async fn test_invalid_rate_fails_crawl() {
        let context = CrawlContext::new(
            Arc::new(StaticPolicy(RobotsDecision::allow())),
            Arc::new(RateLimiter::new(Some(-2.0))),
            Arc::new(proxy_pool()),
        );
        let orchestrator = Orchestrator::new(context, "ua");

        let result = orchestrator.crawl(&request(false, &[])).await;

        assert!(!result.success);
        assert_eq!(result.errors[0].service, Service::Crawler);
        assert!(result.metadata.proxy_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crawl_delay_is_honored() {
        let orchestrator = Orchestrator::new(
            context(
                RobotsDecision {
                    allowed: true,
                    crawl_delay_ms: 1500,
                },
                ProxyPool::disabled(),
            ),
            "ua",
        );

        let start = Instant::now();
        let result = orchestrator.crawl(&request(false, &[])).await;

        assert!(result.success);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_results_are_logged_to_storage() {
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let orchestrator = Orchestrator::new(context(RobotsDecision::allow(), ProxyPool::disabled()), "ua")
            .with_storage(Arc::clone(&storage));

        orchestrator.crawl(&request(false, &[])).await;
        orchestrator.crawl(&request(false, &[])).await;

        assert_eq!(storage.lock().unwrap().count_crawls(Some(true)).unwrap(), 2);
    }
}
