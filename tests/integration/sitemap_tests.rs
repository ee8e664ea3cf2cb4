//! Integration tests for the sitemap walker

use lightcrawl::sitemap::{SchemaRelationship, SitemapWalker, DEFAULT_PRIORITY};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn walker() -> SitemapWalker {
    SitemapWalker::new(reqwest::Client::new(), "seo-service")
}

fn index(server: &MockServer, children: &[&str]) -> String {
    let entries: String = children
        .iter()
        .map(|c| format!("<sitemap><loc>{}{}</loc></sitemap>", server.uri(), c))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

fn urlset(server: &MockServer, pages: &[&str]) -> String {
    let entries: String = pages
        .iter()
        .map(|p| format!("<url><loc>{}{}</loc></url>", server.uri(), p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

async fn mount_xml(server: &MockServer, doc_path: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn seed(server: &MockServer, doc_path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), doc_path)).unwrap()
}

fn paths(seeds: &[lightcrawl::SeedUrl]) -> Vec<String> {
    seeds.iter().map(|s| s.url.path().to_string()).collect()
}

#[tokio::test]
async fn test_shared_child_fetched_once_and_leaves_deduplicated() {
    let server = MockServer::start().await;

    mount_xml(&server, "/sitemap.xml", index(&server, &["/a.xml", "/b.xml"]), 1).await;
    mount_xml(&server, "/a.xml", index(&server, &["/shared.xml", "/a-pages.xml"]), 1).await;
    mount_xml(&server, "/b.xml", index(&server, &["/shared.xml"]), 1).await;
    mount_xml(&server, "/shared.xml", urlset(&server, &["/s1", "/s2"]), 1).await;
    mount_xml(&server, "/a-pages.xml", urlset(&server, &["/s1", "/a1"]), 1).await;

    let report = walker()
        .walk_with_report(&seed(&server, "/sitemap.xml"), None)
        .await;

    assert_eq!(paths(&report.seeds), vec!["/s1", "/s2", "/a1"]);
    assert_eq!(report.stats.nodes_fetched, 5);
    assert_eq!(report.stats.nodes_failed, 0);
    assert!(report.seeds.iter().all(|s| s.service_id == "seo-service"));
    assert!(report.seeds.iter().all(|s| !s.metadata.schema_related));
}

#[tokio::test]
async fn test_cyclic_index_terminates() {
    let server = MockServer::start().await;

    mount_xml(&server, "/a.xml", index(&server, &["/b.xml", "/c.xml"]), 1).await;
    mount_xml(&server, "/b.xml", index(&server, &["/a.xml"]), 1).await;
    mount_xml(&server, "/c.xml", urlset(&server, &["/c1"]), 1).await;

    let report = walker().walk_with_report(&seed(&server, "/a.xml"), None).await;

    assert_eq!(paths(&report.seeds), vec!["/c1"]);
    assert_eq!(report.stats.nodes_fetched, 3);
    assert!(!report.stats.truncated);
}

#[tokio::test]
async fn test_page_url_matching_a_child_sitemap_does_not_block_it() {
    let server = MockServer::start().await;

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&server, &["/pages.xml", "/nested.xml"]),
        1,
    )
    .await;
    mount_xml(&server, "/pages.xml", urlset(&server, &["/p1", "/nested.xml"]), 1).await;
    mount_xml(&server, "/nested.xml", urlset(&server, &["/n1"]), 1).await;

    let report = walker()
        .walk_with_report(&seed(&server, "/sitemap.xml"), None)
        .await;

    assert_eq!(paths(&report.seeds), vec!["/p1", "/nested.xml", "/n1"]);
    assert_eq!(report.stats.nodes_fetched, 3);
}

#[tokio::test]
async fn test_self_referencing_sitemap() {
    let server = MockServer::start().await;

    let body = format!(
        "<sitemapindex><sitemap><loc>{}/loop.xml</loc></sitemap></sitemapindex>",
        server.uri()
    );
    mount_xml(&server, "/loop.xml", body, 1).await;

    let seeds = walker().walk(&seed(&server, "/loop.xml"), None).await;
    assert!(seeds.is_empty());
}

#[tokio::test]
async fn test_failed_nodes_are_contained() {
    let server = MockServer::start().await;

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&server, &["/missing.xml", "/broken.xml", "/ok.xml"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>oops</body></html>"))
        .mount(&server)
        .await;
    mount_xml(&server, "/ok.xml", urlset(&server, &["/p1"]), 1).await;

    let report = walker()
        .walk_with_report(&seed(&server, "/sitemap.xml"), None)
        .await;

    assert_eq!(paths(&report.seeds), vec!["/p1"]);
    assert_eq!(report.stats.nodes_fetched, 2);
    assert_eq!(report.stats.nodes_failed, 2);
    assert!(report.stats.success_rate < 1.0);
}

#[tokio::test]
async fn test_unreachable_seed_returns_empty() {
    let seed = Url::parse("http://127.0.0.1:9/sitemap.xml").unwrap();
    let report = walker().walk_with_report(&seed, None).await;

    assert!(report.seeds.is_empty());
    assert_eq!(report.stats.nodes_failed, 1);
}

#[tokio::test]
async fn test_keyword_filter() {
    let server = MockServer::start().await;

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&server, &["/blog/post-1", "/shop/item-1", "/blog/post-2"]),
        1,
    )
    .await;

    let filter = SchemaRelationship {
        keywords: Some(vec!["blog".to_string()]),
        ..SchemaRelationship::default()
    };
    let seeds = walker()
        .walk(&seed(&server, "/sitemap.xml"), Some(&filter))
        .await;

    assert_eq!(paths(&seeds), vec!["/blog/post-1", "/blog/post-2"]);
    assert!(seeds.iter().all(|s| s.metadata.schema_related));
    assert_eq!(seeds[0].metadata.relationship.as_ref(), Some(&filter));
}

#[tokio::test]
async fn test_priority_is_read_or_defaulted() {
    let server = MockServer::start().await;

    let body = format!(
        "<urlset><url><loc>{uri}/high</loc><priority>0.9</priority></url><url><loc>{uri}/plain</loc></url></urlset>",
        uri = server.uri()
    );
    mount_xml(&server, "/sitemap.xml", body, 1).await;

    let seeds = walker().walk(&seed(&server, "/sitemap.xml"), None).await;

    assert_eq!(seeds.len(), 2);
    assert_eq!(seeds[0].priority, 0.9);
    assert_eq!(seeds[1].priority, DEFAULT_PRIORITY);
}

#[tokio::test]
async fn test_node_limit_stops_walk() {
    let server = MockServer::start().await;

    mount_xml(&server, "/n0.xml", index(&server, &["/n1.xml"]), 1).await;
    mount_xml(&server, "/n1.xml", index(&server, &["/n2.xml"]), 1).await;
    mount_xml(&server, "/n2.xml", index(&server, &["/n3.xml"]), 0).await;

    let report = walker()
        .with_max_nodes(2)
        .walk_with_report(&seed(&server, "/n0.xml"), None)
        .await;

    assert!(report.stats.truncated);
    assert_eq!(report.stats.nodes_visited(), 2);
}
