//! Integration tests for the crawl orchestrator
//!
//! These tests use wiremock to stand in for the target site (robots.txt)
//! and for the mining and OCR engines, and run full crawls end-to-end.

use lightcrawl::config::{parse_config, Config};
use lightcrawl::crawler::{
    CrawlContext, CrawlOptions, CrawlRequest, Orchestrator, RateLimiter, Service,
};
use lightcrawl::proxy::ProxyPool;
use lightcrawl::robots::RobotsGateway;
use lightcrawl::storage::{SqliteStorage, Storage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a config whose engines (when enabled) live on `server`
fn create_test_config(server: &MockServer, extra: &str) -> Config {
    let content = format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[robots]
fetch-timeout-ms = 500

[proxy]
enabled = true

[[proxy.servers]]
id = "p1"
host = "10.255.0.1"
port = 3128

[ocr]
enabled = true
endpoint = "{uri}/ocr"
batch-size = 2
timeout-ms = 2000

{extra}
"#,
        uri = server.uri(),
        extra = extra
    );
    parse_config(&content).expect("test config should be valid")
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_ocr_hello(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "requestId": "r1",
            "text": "hello",
            "confidence": 0.99,
            "blocks": [],
            "latencyMs": 5
        })))
        .mount(server)
        .await;
}

async fn orchestrator(config: &Config) -> Orchestrator {
    let context = CrawlContext::from_config(config, None).unwrap();
    Orchestrator::from_config(config, context, None).await.unwrap()
}

fn page(server: &MockServer, page_path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page_path)).unwrap()
}

fn ocr_request(server: &MockServer, images: usize) -> CrawlRequest {
    CrawlRequest::new(page(server, "/gallery")).with_options(CrawlOptions {
        mine_structure: false,
        extract_images: true,
        images: (0..images)
            .map(|i| page(server, &format!("/img/{}.png", i)))
            .collect(),
    })
}

#[tokio::test]
async fn test_ocr_end_to_end() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_ocr_hello(&server).await;

    let config = create_test_config(&server, "");
    let orchestrator = orchestrator(&config).await;
    let mut events = orchestrator.subscribe();

    let result = orchestrator.crawl(&ocr_request(&server, 1)).await;

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_eq!(result.metadata.has_ocr, Some(true));
    assert_eq!(result.metadata.proxy_id.as_deref(), Some("p1"));

    let ocr = result.data.ocr.expect("OCR data should be present");
    assert_eq!(ocr.text, "hello");
    assert_eq!(ocr.success_rate, 1.0);
    assert_eq!(ocr.total, 1);

    let event = events.recv().await.unwrap();
    assert!(!event.is_error());

    let stats = orchestrator.context().proxies.stats_for("p1").unwrap();
    assert_eq!(stats.success_count, 1);
}

#[tokio::test]
async fn test_ocr_batches_all_images() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("POST"))
        .and(path("/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "line"})))
        .expect(5)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "");
    let result = orchestrator(&config)
        .await
        .crawl(&ocr_request(&server, 5))
        .await;

    let ocr = result.data.ocr.unwrap();
    assert_eq!(ocr.total, 5);
    assert_eq!(ocr.successful, 5);
    assert_eq!(ocr.text, "line\nline\nline\nline\nline");
}

#[tokio::test]
async fn test_robots_denial_consumes_no_proxy() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;

    Mock::given(method("POST"))
        .and(path("/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "");
    let orchestrator = orchestrator(&config).await;
    let mut events = orchestrator.subscribe();

    let request = CrawlRequest::new(page(&server, "/private/report")).with_options(CrawlOptions {
        mine_structure: false,
        extract_images: true,
        images: vec![page(&server, "/img/a.png")],
    });
    let result = orchestrator.crawl(&request).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].service, Service::Crawler);
    assert_eq!(result.errors[0].error, "disallowed by robots.txt");
    assert!(result.data.ocr.is_none());
    assert!(result.metadata.proxy_id.is_none());
    assert_eq!(
        orchestrator.context().proxies.stats_for("p1").unwrap().total_uses(),
        0
    );

    assert!(events.recv().await.unwrap().is_error());
}

#[tokio::test]
async fn test_mining_failure_does_not_block_ocr() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_ocr_hello(&server).await;

    Mock::given(method("POST"))
        .and(path("/mine"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        &server,
        &format!(
            "[layers3d]\nenabled = true\nendpoint = \"{}/mine\"\n",
            server.uri()
        ),
    );
    let orchestrator = orchestrator(&config).await;

    let mut request = ocr_request(&server, 1);
    request.options.mine_structure = true;
    let result = orchestrator.crawl(&request).await;

    assert!(result.success);
    assert_eq!(result.metadata.has_3d_layers, Some(false));
    assert!(result.data.structural_mining.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].service, Service::Mining);

    assert_eq!(result.metadata.has_ocr, Some(true));
    assert_eq!(result.data.ocr.unwrap().text, "hello");
}

#[tokio::test]
async fn test_unreachable_mining_engine_is_left_out() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_ocr_hello(&server).await;

    // Nothing listens on port 9 of the loopback interface
    let config = create_test_config(
        &server,
        "[layers3d]\nenabled = true\nendpoint = \"http://127.0.0.1:9/mine\"\ntimeout-ms = 500\n",
    );
    let orchestrator = orchestrator(&config).await;

    let mut request = ocr_request(&server, 1);
    request.options.mine_structure = true;
    let result = orchestrator.crawl(&request).await;

    assert!(result.success);
    assert!(result.metadata.has_3d_layers.is_none());
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_robots_server_error_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_ocr_hello(&server).await;

    let config = create_test_config(&server, "");
    let result = orchestrator(&config)
        .await
        .crawl(&ocr_request(&server, 1))
        .await;

    assert!(result.success);
    assert_eq!(result.data.ocr.unwrap().text, "hello");
}

#[tokio::test]
async fn test_robots_timeout_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_ocr_hello(&server).await;

    let config = create_test_config(&server, "");
    let result = orchestrator(&config)
        .await
        .crawl(&ocr_request(&server, 1))
        .await;

    assert!(result.success);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_robots_fetched_once_per_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "");
    let orchestrator = orchestrator(&config).await;

    for page_path in ["/a", "/b", "/c"] {
        let result = orchestrator
            .crawl(&CrawlRequest::new(page(&server, page_path)))
            .await;
        assert!(result.success);
    }
}

#[tokio::test]
async fn test_invalid_rate_emits_error_event() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    let config = create_test_config(&server, "");
    let robots = RobotsGateway::new(reqwest::Client::new(), &config.robots, "TestBot");
    let context = CrawlContext::new(
        Arc::new(robots),
        Arc::new(RateLimiter::new(Some(-1.0))),
        Arc::new(ProxyPool::from_config(&config.proxy).unwrap()),
    );
    let orchestrator = Orchestrator::new(context, config.user_agent.header_value());
    let mut events = orchestrator.subscribe();

    let result = orchestrator
        .crawl(&CrawlRequest::new(page(&server, "/")))
        .await;

    assert!(!result.success);
    assert_eq!(result.errors[0].service, Service::Crawler);
    assert!(result.errors[0].error.contains("Invalid rate limit"));

    let event = events.recv().await.unwrap();
    assert!(event.is_error());
    assert_eq!(event.result().url, result.url);
}

#[tokio::test]
async fn test_crawl_log_and_proxy_stats_persist() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("lightcrawl.db");
    let config = create_test_config(&server, "");

    {
        let storage = Arc::new(Mutex::new(SqliteStorage::new(&db_path).unwrap()));
        let context = CrawlContext::from_config(&config, Some(storage.clone())).unwrap();
        let orchestrator = Orchestrator::from_config(&config, context, Some(storage))
            .await
            .unwrap();

        orchestrator.crawl(&CrawlRequest::new(page(&server, "/open"))).await;
        orchestrator
            .crawl(&CrawlRequest::new(page(&server, "/private/x")))
            .await;
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_crawls(None).unwrap(), 2);
    assert_eq!(storage.count_crawls(Some(false)).unwrap(), 1);

    let proxy_stats = storage.load_proxy_stats().unwrap();
    assert_eq!(proxy_stats.get("p1").unwrap().success_count, 1);
    assert_eq!(proxy_stats.get("p1").unwrap().failure_count, 0);
}
