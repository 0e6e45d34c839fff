//! Retry and backoff behavior of the API client.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xenocanto_downloader::config::FetchConfig;
use xenocanto_downloader::fetcher::client::XenoCantoClient;
use xenocanto_downloader::fetcher::{FetchError, RecordingsApi};
use xenocanto_downloader::SpeciesQuery;

const API_PATH: &str = "/api/3/recordings";

fn test_config(server: &MockServer) -> FetchConfig {
    let mut config = FetchConfig::new("test-key");
    config.base_url = format!("{}{}", server.uri(), API_PATH);
    config.request_delay = Duration::ZERO;
    config.rate_limit_cooldown = Duration::ZERO;
    config
}

#[tokio::test]
async fn test_persistent_429_uses_exactly_max_retries_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = XenoCantoClient::new(test_config(&server)).unwrap();
    let result = client
        .fetch_page(&SpeciesQuery::new("Turdus merula"), 1)
        .await;

    assert!(matches!(result, Err(FetchError::RateLimited)));
    assert_eq!(client.calls_made(), 3);
    // The mock's expect(3) verifies no fourth attempt went out.
}

#[tokio::test]
async fn test_transient_server_errors_recover_within_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numRecordings": 1,
            "numPages": 1,
            "recordings": [{"id": "1"}],
        })))
        .mount(&server)
        .await;

    let client = XenoCantoClient::new(test_config(&server)).unwrap();
    let fetched = client
        .fetch_page(&SpeciesQuery::new("Turdus merula"), 1)
        .await
        .expect("third attempt succeeds");

    assert_eq!(fetched.page.recordings.len(), 1);
    assert_eq!(client.calls_made(), 3);
}

#[tokio::test]
async fn test_persistent_server_error_gives_up_after_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = XenoCantoClient::new(test_config(&server)).unwrap();
    let result = client
        .fetch_page(&SpeciesQuery::new("Turdus merula"), 1)
        .await;

    match result {
        Err(FetchError::Http { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected Http error, got {other:?}"),
    }
    assert_eq!(client.calls_made(), 3);
}

#[tokio::test]
async fn test_unauthorized_fails_immediately_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = XenoCantoClient::new(test_config(&server)).unwrap();
    let result = client
        .fetch_page(&SpeciesQuery::new("Turdus merula"), 1)
        .await;

    assert!(matches!(result, Err(FetchError::InvalidApiKey)));
    assert!(result.unwrap_err().is_fatal());
    assert_eq!(client.calls_made(), 1);
}

#[tokio::test]
async fn test_unparseable_success_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = XenoCantoClient::new(test_config(&server)).unwrap();
    let result = client
        .fetch_page(&SpeciesQuery::new("Turdus merula"), 1)
        .await;

    assert!(matches!(result, Err(FetchError::Parse(_))));
    assert_eq!(client.calls_made(), 1);
}
