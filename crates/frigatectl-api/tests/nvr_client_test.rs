#![allow(clippy::unwrap_used)]
// Integration tests for `NvrClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frigatectl_api::{Error, NvrClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NvrClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = NvrClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Poll tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_config_document() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cameras": {
                "front_door": { "enabled": true },
                "garage": { "enabled": false },
                "porch": {}
            }
        })))
        .mount(&server)
        .await;

    let states = client.poll().await.unwrap();

    assert_eq!(states.len(), 3);
    assert_eq!(states.get("front_door"), Some(&true));
    assert_eq!(states.get("garage"), Some(&false));
    assert_eq!(states.get("porch"), Some(&true));
}

#[tokio::test]
async fn test_poll_flat_status_path() {
    let (server, client) = setup().await;
    let client = client.with_status_path("status");

    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "front_door": false })),
        )
        .mount(&server)
        .await;

    let states = client.poll().await.unwrap();
    assert_eq!(states.get("front_door"), Some(&false));
}

#[tokio::test]
async fn test_poll_non_200_is_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.poll().await;

    assert!(
        matches!(result, Err(Error::Status { status: 502, ref body, .. }) if body == "Bad Gateway"),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_poll_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.poll().await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_poll_timeout() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
    let client = NvrClient::new(base_url, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "cameras": {} }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.poll().await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
}

// ── Command tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_enable_camera() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/front_door/enable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.enable_camera("front_door").await.unwrap();
}

#[tokio::test]
async fn test_disable_camera() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/garage/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_state("garage", false).await.unwrap();
}

#[tokio::test]
async fn test_command_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/front_door/enable"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let result = client.set_state("front_door", true).await;

    assert!(
        matches!(result, Err(Error::Status { status: 500, .. })),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_command_non_200_success_code_is_failure() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/front_door/disable"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let result = client.set_state("front_door", false).await;
    assert!(matches!(result, Err(Error::Status { status: 202, .. })));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on port 9 in the test environment.
    let base_url = Url::parse("http://127.0.0.1:9/api").unwrap();
    let client = NvrClient::with_client(reqwest::Client::new(), base_url);

    let err = client.poll().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(err.is_transient());
}
