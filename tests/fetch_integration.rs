//! Integration tests for the page fetcher against a mock HTTP server.

mod support;

use std::time::Duration;

use adscout_core::fetch::{FetchError, FetchTimeouts, PageFetcher, PageSource};
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

fn fetcher() -> PageFetcher {
    PageFetcher::new(FetchTimeouts::disclosure()).unwrap()
}

#[tokio::test]
async fn test_fetch_page_returns_body_and_content_type() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("google.com, pub-1, DIRECT\n", "text/plain; charset=utf-8"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/ads.txt", mock_server.uri());
    let page = fetcher().fetch_page(&url).await.unwrap();

    assert_eq!(page.body, "google.com, pub-1, DIRECT\n");
    assert_eq!(page.content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(page.final_url, url);
    assert!(!page.is_https, "mock server speaks plain HTTP");
}

#[tokio::test]
async fn test_fetch_page_follows_redirects() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/moved/ads.txt", mock_server.uri())),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a"))
        .mount(&mock_server)
        .await;

    let page = fetcher()
        .fetch_page(&format!("{}/ads.txt", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(page.final_url, format!("{}/moved/ads.txt", mock_server.uri()));
    assert_eq!(page.body, "a");
}

#[tokio::test]
async fn test_disclosure_404_is_ads_txt_not_found() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = fetcher()
        .fetch_page(&format!("{}/app-ads.txt", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::AdsTxtNotFound { .. }), "{err:?}");

    let err = fetcher()
        .fetch_text(&format!("{}/store/apps/details?id=x", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::AppNotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn test_status_classification() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = fetcher()
        .fetch_text(&format!("{}/limited", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::RateLimited { .. }), "{err:?}");

    let err = fetcher()
        .fetch_text(&format!("{}/broken", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }), "{err:?}");
}

#[tokio::test]
async fn test_slow_response_times_out_as_connection_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = PageFetcher::new(FetchTimeouts::new(
        Duration::from_millis(500),
        Duration::from_millis(200),
    ))
    .unwrap();
    let err = fetcher
        .fetch_page(&format!("{}/ads.txt", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Connection { .. }), "{err:?}");
}
