use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wishlist_watcher::config::ScraperConfig;
use wishlist_watcher::utils::error::FetchError;
use wishlist_watcher::{HttpPageFetcher, PageFetcher, ProductIdentifier};

use super::{TEST_USER_AGENT, mount_status, product_page};

fn fetcher_for(server: &MockServer) -> HttpPageFetcher {
    HttpPageFetcher::new(&ScraperConfig {
        base_url: server.uri(),
        user_agent: TEST_USER_AGENT.to_string(),
        request_timeout: 2,
        ..ScraperConfig::default()
    })
    .unwrap()
}

fn id(raw: &str) -> ProductIdentifier {
    ProductIdentifier::parse(raw).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_browser_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B07XJ8C8F5"))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Echo Dot", "$49.99")))
        .expect(1)
        .mount(&server)
        .await;

    let body = fetcher_for(&server).fetch(&id("B07XJ8C8F5")).await.unwrap();
    assert!(body.contains("Echo Dot"));
}

#[tokio::test]
async fn test_not_found_maps_to_status() {
    let server = MockServer::start().await;
    mount_status(&server, "B07XJ8C8F5", 404).await;

    let err = fetcher_for(&server).fetch(&id("B07XJ8C8F5")).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_service_unavailable_maps_to_transient_status() {
    let server = MockServer::start().await;
    mount_status(&server, "B07XJ8C8F5", 503).await;

    let err = fetcher_for(&server).fetch(&id("B07XJ8C8F5")).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B07XJ8C8F5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Echo Dot", "$49.99"))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&ScraperConfig {
        base_url: server.uri(),
        request_timeout: 1,
        ..ScraperConfig::default()
    })
    .unwrap();

    let err = fetcher.fetch(&id("B07XJ8C8F5")).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on the discard port locally
    let fetcher = HttpPageFetcher::new(&ScraperConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout: 2,
        ..ScraperConfig::default()
    })
    .unwrap();

    let err = fetcher.fetch(&id("B07XJ8C8F5")).await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
    assert!(err.is_transient());
}
