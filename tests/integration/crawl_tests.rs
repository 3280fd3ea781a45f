//! Integration tests for the crawler
//!
//! These tests use wiremock to serve directory listings and check the full
//! fetch, parse, classify, filter and recurse cycle end-to-end.

use std::time::Duration;
use sumi_sieve::crawler::{
    classify, extract_links, fetch, CrawlOptions, CrawlRequest, Crawler, FilePattern,
    TraversalLimits,
};
use sumi_sieve::{ConfigError, Rebase, SieveError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders an autoindex-style listing page linking to each entry
fn listing(title: &str, entries: &[&str]) -> String {
    let rows: String = entries
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>  2021-12-29 10:00  -\n", href, href))
        .collect();
    format!(
        "<html><head><title>Index of {title}</title></head><body>\n\
         <h1>Index of {title}</h1>\n\
         <pre><a href=\"?C=N;O=D\">Name</a> <a href=\"?C=M;O=A\">Last modified</a>\n\
         <hr><a href=\"../\">Parent Directory</a>\n{rows}</pre></body></html>"
    )
}

/// Mounts a listing page at `route`, expecting exactly `calls` requests
async fn mount_listing(server: &MockServer, route: &str, entries: &[&str], calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(route, entries))
                .insert_header("content-type", "text/html"),
        )
        .expect(calls)
        .mount(server)
        .await;
}

fn test_options(limits: TraversalLimits) -> CrawlOptions {
    CrawlOptions {
        limits,
        request_timeout: Duration::from_secs(5),
        ..CrawlOptions::default()
    }
}

fn crawler() -> Crawler {
    Crawler::new(test_options(TraversalLimits::default())).expect("Failed to create crawler")
}

#[tokio::test]
async fn test_non_recursive_matches_single_page_pipeline() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a.nc", "b.txt", "sub/"], 2).await;
    mount_listing(&mock_server, "/root/sub/", &["c.nc"], 0).await;

    let request = CrawlRequest::new(&base_url).pattern(Some(r"\.nc$"));
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    // The same result through the individual stages, using the second allowed fetch.
    let client = reqwest::Client::new();
    let content = fetch(&client, &base_url, &CancellationToken::new()).await;
    let page = url::Url::parse(&base_url).unwrap();
    let candidates = classify(extract_links(&content, &page)).candidates;
    let expected = FilePattern::new(Some(r"\.nc$")).unwrap().filter(&candidates);

    assert_eq!(report.files, expected);
    assert_eq!(report.files, vec![format!("{}a.nc", base_url)]);
    assert_eq!(report.stats.pages_fetched, 1);
}

#[tokio::test]
async fn test_recursive_crawl_orders_files_before_subdirectories() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["sub/", "a.txt"], 1).await;
    mount_listing(&mock_server, "/root/sub/", &["b.txt"], 1).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![format!("{}a.txt", base_url), format!("{}sub/b.txt", base_url)]
    );
    assert!(!report.truncated);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_failed_subdirectory_does_not_stop_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["broken/", "ok/"], 1).await;
    Mock::given(method("GET"))
        .and(path("/root/broken/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server, "/root/ok/", &["x.nc"], 1).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec![format!("{}ok/x.nc", base_url)]);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(report.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_unreachable_base_yields_empty_result() {
    let request = CrawlRequest::new("http://127.0.0.1:1/root/").recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert!(report.files.is_empty());
    assert_eq!(report.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_self_referencing_listing_terminates() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    // Links to itself, its parent, and the server root; the sub-directory
    // links straight back up.
    mount_listing(&mock_server, "/root/", &["./", "/root/", "/", "sub/", "a.nc"], 1).await;
    mount_listing(&mock_server, "/root/sub/", &["../", "../sub/", "./", "b.nc"], 1).await;
    mount_listing(&mock_server, "/", &["root/"], 0).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = tokio::time::timeout(Duration::from_secs(10), crawler().crawl(&request))
        .await
        .expect("Crawl did not terminate")
        .expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![format!("{}a.nc", base_url), format!("{}sub/b.nc", base_url)]
    );
    assert!(report.stats.skipped_visited > 0);
}

#[tokio::test]
async fn test_shared_directory_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["one/", "two/"], 1).await;
    mount_listing(&mock_server, "/root/one/", &["/root/shared/", "1.nc"], 1).await;
    mount_listing(&mock_server, "/root/two/", &["/root/shared/", "2.nc"], 1).await;
    mount_listing(&mock_server, "/root/shared/", &["s.nc"], 1).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    let shared = format!("{}shared/s.nc", base_url);
    assert_eq!(report.files.iter().filter(|f| **f == shared).count(), 1);
    assert_eq!(report.files.len(), 3);
}

#[tokio::test]
async fn test_sibling_order_follows_listing_not_completion() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["slow/", "fast/"], 1).await;
    Mock::given(method("GET"))
        .and(path("/root/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing("/root/slow/", &["s.nc"]))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server, "/root/fast/", &["f.nc"], 1).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![format!("{}slow/s.nc", base_url), format!("{}fast/f.nc", base_url)]
    );
}

#[tokio::test]
async fn test_depth_limit_stops_descent() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a/", "0.nc"], 1).await;
    mount_listing(&mock_server, "/root/a/", &["b/", "1.nc"], 1).await;
    mount_listing(&mock_server, "/root/a/b/", &["2.nc"], 0).await;

    let crawler = Crawler::new(test_options(TraversalLimits {
        max_depth: 1,
        ..TraversalLimits::default()
    }))
    .unwrap();
    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler.crawl(&request).await.expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![format!("{}0.nc", base_url), format!("{}a/1.nc", base_url)]
    );
    assert!(report.truncated);
    assert_eq!(report.stats.skipped_depth, 1);
}

#[tokio::test]
async fn test_page_limit_caps_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a/", "b/", "c/"], 1).await;
    mount_listing(&mock_server, "/root/a/", &["a.nc"], 1).await;
    mount_listing(&mock_server, "/root/b/", &["b.nc"], 0).await;
    mount_listing(&mock_server, "/root/c/", &["c.nc"], 0).await;

    let crawler = Crawler::new(test_options(TraversalLimits {
        max_pages: 2,
        ..TraversalLimits::default()
    }))
    .unwrap();
    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler.crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec![format!("{}a/a.nc", base_url)]);
    assert!(report.truncated);
    assert_eq!(report.stats.skipped_page_limit, 2);
}

#[tokio::test]
async fn test_out_of_range_limits_send_no_requests() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a.nc"], 0).await;

    let zero_pages = test_options(TraversalLimits {
        max_pages: 0,
        ..TraversalLimits::default()
    });
    let no_timeout = CrawlOptions {
        request_timeout: Duration::ZERO,
        ..test_options(TraversalLimits::default())
    };

    for options in [zero_pages, no_timeout] {
        let result = match Crawler::new(options) {
            Ok(crawler) => crawler
                .crawl(&CrawlRequest::new(&base_url))
                .await
                .map(|report| report.files),
            Err(e) => Err(e),
        };
        assert!(matches!(
            result,
            Err(SieveError::Config(ConfigError::Validation(_)))
        ));
    }
}

#[tokio::test]
async fn test_page_limit_of_one_fetches_base_only() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a.nc", "sub/"], 1).await;
    mount_listing(&mock_server, "/root/sub/", &["b.nc"], 0).await;

    let crawler = Crawler::new(test_options(TraversalLimits {
        max_pages: 1,
        ..TraversalLimits::default()
    }))
    .unwrap();
    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler.crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec![format!("{}a.nc", base_url)]);
    assert!(report.truncated);
}

#[tokio::test]
async fn test_single_fetch_slot_crawls_whole_tree() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a/", "b/"], 1).await;
    mount_listing(&mock_server, "/root/a/", &["aa/", "a.nc"], 1).await;
    mount_listing(&mock_server, "/root/a/aa/", &["aa.nc"], 1).await;
    mount_listing(&mock_server, "/root/b/", &["b.nc"], 1).await;

    let crawler = Crawler::new(test_options(TraversalLimits {
        max_concurrent_fetches: 1,
        ..TraversalLimits::default()
    }))
    .unwrap();
    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = tokio::time::timeout(Duration::from_secs(10), crawler.crawl(&request))
        .await
        .expect("Crawl deadlocked")
        .expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![
            format!("{}a/a.nc", base_url),
            format!("{}a/aa/aa.nc", base_url),
            format!("{}b/b.nc", base_url),
        ]
    );
}

#[tokio::test]
async fn test_directories_outside_base_are_not_crawled() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/data/", mock_server.uri());

    mount_listing(
        &mock_server,
        "/root/data/",
        &["/root/other/", "/root/", "in/", "/root/other/direct.nc"],
        1,
    )
    .await;
    mount_listing(&mock_server, "/root/data/in/", &["in.nc"], 1).await;
    mount_listing(&mock_server, "/root/other/", &["o.nc"], 0).await;
    mount_listing(&mock_server, "/root/", &["r.nc"], 0).await;

    let request = CrawlRequest::new(&base_url).recurse(true);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    // File links outside the tree are kept; directories there are not entered.
    assert_eq!(
        report.files,
        vec![
            format!("{}/root/other/direct.nc", mock_server.uri()),
            format!("{}in/in.nc", base_url),
        ]
    );
    assert_eq!(report.stats.skipped_out_of_scope, 2);
}

#[tokio::test]
async fn test_base_without_slash_is_confined_to_its_own_tree() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/data", mock_server.uri());

    // Served without a redirect, so relative links resolve against /root/.
    mount_listing(&mock_server, "/root/data", &["other/", "data/sub/", "x.nc"], 1).await;
    mount_listing(&mock_server, "/root/other/", &["o.nc"], 0).await;
    Mock::given(method("GET"))
        .and(path("/root/data/sub/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<pre><a href=\"s.nc\">s.nc</a></pre>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = CrawlRequest::new(&base_url)
        .recurse(true)
        .pattern(Some(r"\.nc$"));
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(
        report.files,
        vec![
            format!("{}/root/x.nc", mock_server.uri()),
            format!("{}/sub/s.nc", base_url),
        ]
    );
    assert!(report.stats.skipped_out_of_scope > 0);
}

#[tokio::test]
async fn test_redirected_base_resolves_against_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/data", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/root/data"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/root/data/"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server, "/root/data/", &["sub/", "../other/", "x.nc"], 1).await;
    mount_listing(&mock_server, "/root/data/sub/", &["s.nc"], 1).await;
    mount_listing(&mock_server, "/root/other/", &["o.nc"], 0).await;

    let request = CrawlRequest::new(&base_url)
        .recurse(true)
        .prepend_base(false);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec!["x.nc", "sub/s.nc"]);
    assert_eq!(report.stats.pages_fetched, 2);
}

#[tokio::test]
async fn test_relative_output() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["sub/", "a.txt"], 1).await;
    mount_listing(&mock_server, "/root/sub/", &["b.txt"], 1).await;

    let request = CrawlRequest::new(&base_url)
        .recurse(true)
        .prepend_base(false);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec!["a.txt", "sub/b.txt"]);
}

#[tokio::test]
async fn test_legacy_prefix_output() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a.txt"], 1).await;

    let request = CrawlRequest::new(&base_url).rebase(Rebase::LegacyPrefix);
    let report = crawler().crawl(&request).await.expect("Crawl failed");

    assert_eq!(report.files, vec![format!("{0}{0}a.txt", base_url)]);
}

#[tokio::test]
async fn test_cancellation_returns_partial_results() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["slow/", "a.nc"], 1).await;
    Mock::given(method("GET"))
        .and(path("/root/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing("/root/slow/", &["s.nc"]))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let request = CrawlRequest::new(&base_url).recurse(true);
    let started = std::time::Instant::now();
    let report = crawler()
        .crawl_with_cancellation(&request, cancel)
        .await
        .expect("Crawl failed");

    assert!(report.cancelled);
    assert_eq!(report.files, vec![format!("{}a.nc", base_url)]);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_invalid_pattern_sends_no_requests() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["a.nc"], 0).await;

    let request = CrawlRequest::new(&base_url).pattern(Some("*.nc"));
    assert!(crawler().crawl(&request).await.is_err());
}

#[tokio::test]
async fn test_convenience_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/root/", mock_server.uri());

    mount_listing(&mock_server, "/root/", &["x.nc", "x.txt", "sub/"], 1).await;
    mount_listing(&mock_server, "/root/sub/", &["y.nc"], 1).await;

    let files = sumi_sieve::crawl(&base_url, true, Some(r"\.nc$"), true)
        .await
        .expect("Crawl failed");

    assert_eq!(
        files,
        vec![format!("{}x.nc", base_url), format!("{}sub/y.nc", base_url)]
    );
}
