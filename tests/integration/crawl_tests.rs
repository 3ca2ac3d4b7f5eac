//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! crawls end-to-end: seeding, workers, supervision and draining.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wheres_my_value::config::{Config, CrawlerConfig, EngineConfig, HistoryConfig, OutputConfig};
use wheres_my_value::output::TerminationReason;
use wheres_my_value::search::SearchKind;
use wheres_my_value::WebCrawler;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short delays and polling intervals
fn create_test_config(base_url: &str, values: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: format!("{}/", base_url),
            search_values: values.iter().map(|v| v.to_string()).collect(),
            sleep_time: 0.1, // Minimum allowed, keeps tests fast
            timeout: 5.0,
            max_pages: 50,
            max_depth: 5,
            max_workers: 1,
            respect_robots: false,
        },
        history: HistoryConfig::default(),
        output: OutputConfig::default(),
        engine: EngineConfig {
            pop_timeout_ms: 50,
            poll_interval_ms: 20,
            idle_checks: 3,
            save_every_pages: 10,
            no_progress_timeout: 30.0,
            drain_timeout_ms: 2000,
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

/// Mounts an HTML page that must be requested exactly `times` times
async fn mount_page(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_follows_same_domain_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<a href="/page1">Page 1</a>
               <a href="{}/page2">Page 2</a>
               <a href="https://other.com/page3">Other</a>
               <a href="/file.pdf">PDF</a>"#,
            base
        ),
        1,
    )
    .await;
    mount_page(&server, "/page1", r#"<a href="/page2">again</a>"#, 1).await;
    mount_page(&server, "/page2", r#"<a href="/">home</a>"#, 1).await;
    mount_page(&server, "/file.pdf", "", 0).await;

    let mut config = create_test_config(&base, &["not-on-any-page"]);
    config.crawler.max_workers = 3;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.visited_urls, 3);
    assert_eq!(report.error_count, 0);
    assert!(report.found_values.is_empty());
}

#[tokio::test]
async fn test_text_match_marks_value_found() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>There is a match here</p>", 1).await;

    let config = create_test_config(&server.uri(), &["match"]);
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::AllValuesFound);
    assert_eq!(report.matches(SearchKind::Text, "match").len(), 1);
    assert!(report.matches(SearchKind::Id, "match").is_empty());
    assert!(report.matches(SearchKind::Class, "match").is_empty());
    assert!(report.matches(SearchKind::Attr, "match").is_empty());

    let summary = report.summary();
    assert_eq!(summary.found_values, vec!["match".to_string()]);
    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.errors, 0);
}

#[tokio::test]
async fn test_non_text_matches_do_not_mark_found() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<div id="signup-box" class="signup"><form data-role="signup"></form></div>"#,
        1,
    )
    .await;

    let config = create_test_config(&server.uri(), &["signup"]);
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
    assert_eq!(report.matches(SearchKind::Id, "signup").len(), 1);
    assert_eq!(report.matches(SearchKind::Class, "signup").len(), 1);
    assert!(!report.matches(SearchKind::Attr, "signup").is_empty());
    assert!(report.found_values.is_empty());
}

#[tokio::test]
async fn test_hidden_input_value_is_found() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<form><input type="hidden" name="key" value="sk-12345"></form>"#,
        1,
    )
    .await;

    let config = create_test_config(&server.uri(), &["sk-12345"]);
    let report = WebCrawler::new(config).unwrap().run().await;

    assert!(report.is_found("sk-12345"));
    let matches = report.matches(SearchKind::Text, "sk-12345");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].node.hidden_reason(), Some("Hidden input field"));
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/slow">Slow</a><a href="/ok">Ok</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("late").set_delay(Duration::from_secs(3)))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<p>fine</p>", 1).await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.timeout = 0.5;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.error_log.len(), 1);
    assert!(report.error_log[0].contains("/slow"));
    // The failed URL is visited but not counted as a page
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.visited_urls, 3);
}

#[tokio::test]
async fn test_page_budget_stops_crawl() {
    let server = MockServer::start().await;
    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links, 1).await;
    for i in 0..10 {
        mount_page(&server, &format!("/p{}", i), "", 0).await;
    }

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.max_pages = 1;
    config.crawler.max_workers = 3;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::PageBudgetReached);
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn test_depth_cutoff() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/level1">1</a>"#, 1).await;
    mount_page(&server, "/level1", r#"<a href="/level2">2</a>"#, 1).await;
    mount_page(&server, "/level2", "", 0).await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.max_depth = 1;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
}

#[tokio::test]
async fn test_robots_disallowed_urls_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/a">Private</a><a href="/public">Public</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/private/a", "", 0).await;
    mount_page(&server, "/public", "", 1).await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.respect_robots = true;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.pages_visited, 2);
}

#[tokio::test]
async fn test_start_url_disallowed_by_robots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;
    mount_page(&server, "/", "", 0).await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.respect_robots = true;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::StartDisallowed);
    assert_eq!(report.pages_visited, 0);
}

#[tokio::test]
async fn test_robots_load_failure_disables_checking() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>open</p>", 1).await;

    let mut config = create_test_config(&server.uri(), &["open"]);
    config.crawler.respect_robots = true;

    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::AllValuesFound);
    // robots.txt failures are not crawl errors
    assert_eq!(report.error_count, 0);
}

#[tokio::test]
async fn test_start_url_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &["absent"]);
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::StartUnreachable);
    assert_eq!(report.error_count, 1);
    assert!(report.error_log[0].contains("HTTP 503"));
}

#[tokio::test]
async fn test_non_html_page_is_visited_without_results() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/download">Get</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("needle <a href=\"/hidden\">x</a>", "application/octet-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/hidden", "", 0).await;

    let config = create_test_config(&server.uri(), &["needle"]);
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.error_count, 0);
    assert!(report.found_values.is_empty());
}

#[tokio::test]
async fn test_history_prevents_refetch() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        r#"<a href="/page1">1</a><a href="/page2">2</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/page1", "", 0).await;
    mount_page(&server, "/page2", "", 1).await;

    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");
    std::fs::write(
        &history_path,
        serde_json::json!({ "visited_urls": [format!("{}/page1", base)] }).to_string(),
    )
    .unwrap();

    let mut config = create_test_config(&base, &["absent"]);
    config.history = HistoryConfig {
        enabled: true,
        file: Some(history_path.clone()),
    };

    let report = WebCrawler::new(config).unwrap().run().await;
    assert_eq!(report.pages_visited, 2);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&history_path).unwrap()).unwrap();
    let urls: HashSet<String> = saved["visited_urls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        urls,
        HashSet::from([
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ])
    );
}

#[tokio::test]
async fn test_start_url_already_in_history() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "", 0).await;

    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");
    std::fs::write(
        &history_path,
        serde_json::json!({ "visited_urls": [format!("{}/", server.uri())] }).to_string(),
    )
    .unwrap();

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.history = HistoryConfig {
        enabled: true,
        file: Some(history_path),
    };

    let report = WebCrawler::new(config).unwrap().run().await;
    assert_eq!(report.termination, TerminationReason::AlreadyVisited);
    assert_eq!(report.pages_visited, 0);
}

#[tokio::test]
async fn test_fresh_ignores_history() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>x</p>", 1).await;

    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");
    std::fs::write(
        &history_path,
        serde_json::json!({ "visited_urls": [format!("{}/", server.uri())] }).to_string(),
    )
    .unwrap();

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.history = HistoryConfig {
        enabled: true,
        file: Some(history_path),
    };

    let report = WebCrawler::fresh(config).unwrap().run().await;
    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn test_stop_handle_cancels_run() {
    let server = MockServer::start().await;
    let links: String = (0..5)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links, 1).await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    // Long politeness delay; the stop must interrupt it
    config.crawler.sleep_time = 10.0;

    let crawler = WebCrawler::new(config).unwrap();
    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stop.stop();
    });

    let started = Instant::now();
    let report = crawler.run().await;

    assert_eq!(report.termination, TerminationReason::Cancelled);
    assert_eq!(report.pages_visited, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_progress_callback_is_invoked() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">a</a>"#, 1).await;
    mount_page(&server, "/a", "", 1).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen_max = Arc::new(AtomicUsize::new(0));

    let config = create_test_config(&server.uri(), &["absent"]);
    let crawler = {
        let calls = Arc::clone(&calls);
        let seen_max = Arc::clone(&seen_max);
        WebCrawler::new(config)
            .unwrap()
            .with_progress_callback(move |_pages, max| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen_max.store(max, Ordering::SeqCst);
            })
    };

    let report = crawler.run().await;

    assert_eq!(report.pages_visited, 2);
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(seen_max.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn test_panicking_progress_callback_does_not_stop_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">a</a>"#, 1).await;
    mount_page(&server, "/a", "", 1).await;

    let config = create_test_config(&server.uri(), &["absent"]);
    let report = WebCrawler::new(config)
        .unwrap()
        .with_progress_callback(|_, _| panic!("callback failure"))
        .run()
        .await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.termination, TerminationReason::FrontierExhausted);
}

#[tokio::test]
async fn test_huge_crawl_delay_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e30"))
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>needle</p>", 1).await;

    let mut config = create_test_config(&server.uri(), &["needle"]);
    config.crawler.respect_robots = true;

    let started = Instant::now();
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::AllValuesFound);
    assert_eq!(report.pages_visited, 1);
    // The stop interrupts the clamped politeness sleep
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_stalled_fetch_ends_with_no_progress() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/stalled">stalled</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(html("late").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), &["absent"]);
    config.crawler.timeout = 30.0;
    config.engine.no_progress_timeout = 0.5;
    config.engine.drain_timeout_ms = 200;

    let started = Instant::now();
    let report = WebCrawler::new(config).unwrap().run().await;

    assert_eq!(report.termination, TerminationReason::NoProgress);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.error_count, 0);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_history_saved_as_soon_as_value_found() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", r#"<p>alpha</p><a href="/stalled">next</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(html("late").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");

    let mut config = create_test_config(&base, &["alpha", "beta"]);
    config.crawler.timeout = 30.0;
    config.engine.drain_timeout_ms = 200;
    config.history = HistoryConfig {
        enabled: true,
        file: Some(history_path.clone()),
    };

    let crawler = WebCrawler::new(config).unwrap();
    let stop = crawler.stop_handle();
    let finished = Arc::new(AtomicBool::new(false));

    let run = {
        let finished = Arc::clone(&finished);
        async move {
            let report = crawler.run().await;
            finished.store(true, Ordering::SeqCst);
            report
        }
    };

    let watch = async {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !history_path.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        // Periodic saves are every 10 pages and the run is still going,
        // so this file comes from the save on the first text match
        let saved_mid_run = history_path.exists() && !finished.load(Ordering::SeqCst);
        let content = std::fs::read_to_string(&history_path).unwrap_or_default();
        stop.stop();
        (saved_mid_run, content)
    };

    let (report, (saved_mid_run, content)) = tokio::join!(run, watch);

    assert!(saved_mid_run);
    let saved: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(saved["visited_urls"], serde_json::json!([format!("{}/", base)]));
    assert_eq!(report.termination, TerminationReason::Cancelled);
    assert!(report.is_found("alpha"));
}
