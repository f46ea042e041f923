//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use site_discovery::config::{Config, OverflowPolicy};
use site_discovery::crawler::{PageFetchResult, StaticFetcher};
use site_discovery::extract::{ExtractError, LinkExtractor, LinkSource, StaticMarkupExtractor};
use site_discovery::output::{DiagnosticRecord, MemorySink};
use site_discovery::state::AbortReason;
use site_discovery::{crawl, Coordinator, CrawlStatus, PageState};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a single seed with fast failure handling
fn create_test_config(seed: &str, max_pages: usize) -> Config {
    let mut config = Config::for_seeds([seed], max_pages);
    config.retry.max_retries = 0;
    config.retry.base_delay_ms = 10;
    config.crawl.page_timeout_ms = 5_000;
    config
}

/// Mounts an HTML page at `route`
async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn static_coordinator(config: Config) -> Coordinator {
    let fetcher = StaticFetcher::new(&config).expect("Failed to build HTTP client");
    Coordinator::new(config, Arc::new(fetcher)).expect("Failed to create coordinator")
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        r#"<html><body>
        <a href="/page1">Page 1</a>
        <a href="/page2#top">Page 2</a>
        <a href="https://elsewhere.test/x">External</a>
        <a href="mailto:team@site.test">Mail</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &mock_server,
        "/page1",
        r#"<a href="/page2">Page 2</a><a href="/missing">Gone</a>"#,
    )
    .await;
    mount_html(&mock_server, "/page2", r#"<a href="/data.json">Data</a>"#).await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let report = static_coordinator(create_test_config(&base_url, 10)).run().await;

    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages.len(), 5);
    assert_eq!(report.summary.pages_crawled, 3);
    assert_eq!(report.summary.pages_errored, 1);
    assert_eq!(report.summary.pages_skipped, 1);
    assert_eq!(report.summary.links_filtered_by_domain, 1);
    assert!(report.summary.links_rejected >= 1);

    let state_of = |suffix: &str| {
        report
            .pages
            .iter()
            .find(|p| p.url.ends_with(suffix))
            .map(|p| p.state)
    };
    assert_eq!(state_of("/page1"), Some(PageState::Extracted));
    assert_eq!(state_of("/missing"), Some(PageState::Errored));
    assert_eq!(state_of("/data.json"), Some(PageState::Skipped));

    // Fragment stripped, so /page2 is fetched once
    let page2_visits = report.pages.iter().filter(|p| p.url.ends_with("/page2")).count();
    assert_eq!(page2_visits, 1);
    assert!(report.summary.duplicate_links_skipped >= 1);
}

#[tokio::test]
async fn test_max_pages_is_a_hard_cap() {
    let mock_server = MockServer::start().await;

    mount_html(
        &mock_server,
        "/",
        r#"<a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#,
    )
    .await;
    for route in ["/a", "/b", "/c"] {
        mount_html(&mock_server, route, "<p>leaf</p>").await;
    }

    let report = static_coordinator(create_test_config(&mock_server.uri(), 2)).run().await;

    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.summary.links_discovered, 3);
}

#[tokio::test]
async fn test_empty_seed_page_completes_with_diagnostic() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/", "<html><body><p>Nothing here</p></body></html>").await;

    let sink = Arc::new(MemorySink::new());
    let report = static_coordinator(create_test_config(&mock_server.uri(), 5))
        .with_sink(sink.clone())
        .run()
        .await;

    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.summary.pages_crawled, 1);
    assert_eq!(report.summary.pages_without_links, 1);

    let dumps = sink.filter(|r| matches!(r, DiagnosticRecord::EmptyLinkSet { .. }));
    assert_eq!(dumps.len(), 1);
    match &dumps[0] {
        DiagnosticRecord::EmptyLinkSet {
            host,
            candidate_count,
            accepted_domains,
            ..
        } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(*candidate_count, 0);
            assert_eq!(accepted_domains, &vec!["127.0.0.1".to_string()]);
        }
        other => panic!("unexpected record {:?}", other),
    }

    // One yield line per source
    let yields = sink.filter(|r| matches!(r, DiagnosticRecord::SourceYield { .. }));
    assert_eq!(yields.len(), LinkSource::ALL.len());
}

struct BrokenExtractor;

impl LinkExtractor for BrokenExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::ScriptCollected
    }

    fn extract(&self, _page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        Err(ExtractError::ScriptResult("script threw".to_string()))
    }
}

#[tokio::test]
async fn test_failing_extractor_does_not_reduce_other_sources() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#).await;

    let run = |extractors: Vec<Box<dyn LinkExtractor>>| {
        let config = create_test_config(&mock_server.uri(), 1);
        let sink = Arc::new(MemorySink::new());
        let coordinator = static_coordinator(config)
            .with_extractors(extractors)
            .with_sink(sink.clone());
        async move { (coordinator.run().await, sink) }
    };

    let (alone, _) = run(vec![Box::new(StaticMarkupExtractor)]).await;
    let (with_broken, sink) = run(vec![Box::new(BrokenExtractor), Box::new(StaticMarkupExtractor)]).await;

    let markup_yield = |report: &site_discovery::CrawlReport| {
        report.pages[0].links[&LinkSource::StaticMarkup].unique
    };
    assert_eq!(markup_yield(&alone), 2);
    assert_eq!(markup_yield(&with_broken), 2);
    assert_eq!(with_broken.summary.links_discovered, 2);
    assert_eq!(with_broken.summary.extractor_failures, 1);

    let failures = sink.filter(|r| matches!(r, DiagnosticRecord::ExtractorFailed { .. }));
    assert_eq!(failures.len(), 1);
}

#[tokio::test]
async fn test_redirect_target_is_not_fetched_again() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/", r#"<a href="/old">old</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/new",
        r#"<a href="/new">self</a><a href="other">other</a>"#,
    )
    .await;
    mount_html(&mock_server, "/other", "<p>leaf</p>").await;

    let report = static_coordinator(create_test_config(&base_url, 10)).run().await;

    let urls: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls.len(), 3, "visited: {:?}", urls);
    assert!(!urls.iter().any(|u| u.ends_with("/new")));

    let old = report.pages.iter().find(|p| p.url.ends_with("/old")).unwrap();
    assert!(old.final_url.ends_with("/new"));
    // Relative reference resolved against the final URL
    assert!(urls.iter().any(|u| u.ends_with("/other")));
}

#[tokio::test]
async fn test_redirect_to_queued_page_fetches_it_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/", r#"<a href="/old">old</a><a href="/new">new</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/new", "<p>new</p>").await;

    let mut config = create_test_config(&base_url, 10);
    config.crawl.workers = 1;
    let report = static_coordinator(config).run().await;

    let requests = mock_server.received_requests().await.unwrap();
    let new_hits = requests.iter().filter(|r| r.url.path() == "/new").count();
    assert_eq!(new_hits, 1);

    assert_eq!(report.pages.len(), 2);
    let finals = report.pages.iter().filter(|p| p.final_url.ends_with("/new")).count();
    assert_eq!(finals, 1);
    assert_eq!(report.summary.pages_duplicate, 0);
}

#[tokio::test]
async fn test_redirect_to_visited_page_is_recorded_as_duplicate() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/", r#"<a href="/new">new</a><a href="/old">old</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/new", "<p>new</p>").await;

    let mut config = create_test_config(&base_url, 10);
    config.crawl.workers = 1;
    let report = static_coordinator(config).run().await;

    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.summary.pages_crawled, 2);
    assert_eq!(report.summary.pages_duplicate, 1);
    let old = report.pages.iter().find(|p| p.url.ends_with("/old")).unwrap();
    assert_eq!(old.state, PageState::Duplicate);
}

#[tokio::test]
async fn test_frontier_overflow_is_counted() {
    let mock_server = MockServer::start().await;
    let mut body = String::new();
    for i in 0..6 {
        body.push_str(&format!(r#"<a href="/p{}">p</a>"#, i));
    }
    mount_html(&mock_server, "/", &body).await;

    let mut config = create_test_config(&mock_server.uri(), 1);
    config.crawl.max_frontier_size = 4;
    config.retry.overflow_policy = OverflowPolicy::Drop;

    let sink = Arc::new(MemorySink::new());
    let report = static_coordinator(config).with_sink(sink.clone()).run().await;

    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.summary.links_discovered, 4);
    assert_eq!(report.summary.frontier_overflow, 2);
    let overflows = sink.filter(|r| matches!(r, DiagnosticRecord::FrontierOverflow { .. }));
    assert_eq!(overflows.len(), 2);
}

#[tokio::test]
async fn test_deadline_aborts_with_partial_results() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>slow</p>", "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 5);
    config.crawl.crawl_deadline_secs = Some(1);
    config.crawl.page_timeout_ms = 10_000;

    let report = static_coordinator(config).run().await;

    assert_eq!(report.status, CrawlStatus::Aborted);
    assert_eq!(report.abort_reason, Some(AbortReason::Deadline));
    assert!(report.pages.is_empty());
}

#[tokio::test]
async fn test_crawl_entry_point_writes_report() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/",
        r#"<a href="/about">About</a><a href="https://elsewhere.test/">Out</a>"#,
    )
    .await;
    mount_html(&mock_server, "/about", "<h1>About</h1>").await;

    let mut config = create_test_config(&mock_server.uri(), 10);
    config.crawl.retain_content = true;

    let report = crawl(config).await.expect("crawl failed");
    assert_eq!(report.summary.pages_crawled, 2);
    assert!(report.pages[1].content.as_deref().unwrap().contains("About"));

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    report.write_json(&report_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["summary"]["pages_crawled"], 2);
    assert_eq!(json["pages"][0]["state"], "extracted");
    assert_eq!(json["samples"]["filtered"][0]["url"], "https://elsewhere.test/");
    assert_eq!(json["samples"]["filtered"][0]["reason"], "out_of_domain");
}
