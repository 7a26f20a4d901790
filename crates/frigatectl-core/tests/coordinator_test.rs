#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` against a wiremock NVR.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frigatectl_core::{
    Coordinator, CoordinatorConfig, CoordinatorEvent, CoreError, OptimisticSwitch, ViewSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> CoordinatorConfig {
    let url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let mut cfg = CoordinatorConfig::for_url(url);
    cfg.poll_interval = Duration::ZERO;
    cfg.settle_delay = Duration::from_millis(50);
    cfg.assumed_state_grace = Duration::from_secs(5);
    cfg.timeout = Duration::from_millis(250);
    cfg
}

fn cameras(front_door: bool) -> Value {
    json!({
        "mqtt": { "host": "broker" },
        "cameras": {
            "front_door": { "enabled": front_door, "ffmpeg": {} },
            "garage": { "enabled": false }
        }
    })
}

async fn mount_config(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_command(server: &MockServer, camera: &str, action: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/api/{camera}/{action}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn started(server: &MockServer) -> Coordinator {
    let coordinator = Coordinator::new(config_for(server)).unwrap();
    coordinator.start().await.unwrap();
    coordinator
}

// ── Startup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_loads_cameras() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(true)).await;

    let coordinator = started(&server).await;

    let views = coordinator.views();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].name, "front_door");
    assert!(views[0].enabled);
    assert_eq!(views[0].source, ViewSource::Observed);
    assert!(!views[1].enabled);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_start_rejects_nvr_without_cameras() {
    let server = MockServer::start().await;
    mount_config(&server, json!({ "cameras": {} })).await;

    let coordinator = Coordinator::new(config_for(&server)).unwrap();
    let err = coordinator.start().await.unwrap_err();

    assert!(matches!(err, CoreError::NoCameras { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_start_reports_failed_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config_for(&server)).unwrap();
    let err = coordinator.start().await.unwrap_err();

    assert!(matches!(err, CoreError::PollFailed { timed_out: false, .. }), "got: {err:?}");
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disable_holds_pending_value_until_settle_poll() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(true)).await;
    let coordinator = started(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/front_door/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    coordinator.turn_off("front_door").await.unwrap();

    // The NVR has not caught up yet.
    coordinator.refresh().await.unwrap();
    let view = coordinator.view("front_door").unwrap();
    assert!(!view.enabled);
    assert_eq!(view.source, ViewSource::Pending);

    // Now it has.
    server.verify().await;
    server.reset().await;
    mount_config(&server, cameras(false)).await;
    coordinator.wait_idle().await;

    let view = coordinator.view("front_door").unwrap();
    assert!(!view.enabled);
    assert_eq!(view.source, ViewSource::Observed);
    assert!(coordinator.pending().is_empty());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_rejected_command_rolls_back() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(false)).await;
    mount_command(&server, "front_door", "enable", 500).await;
    let coordinator = started(&server).await;
    let mut events = coordinator.subscribe();

    let err = coordinator.turn_on("front_door").await.unwrap_err();

    assert!(matches!(err, CoreError::CommandFailed { .. }), "got: {err:?}");
    assert!(coordinator.pending().is_empty());
    assert!(!coordinator.view("front_door").unwrap().enabled);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let CoordinatorEvent::CommandFailed { camera, desired, .. } = &*event {
            assert_eq!(camera, "front_door");
            assert!(*desired);
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_accepted_status_other_than_200_is_failure() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(true)).await;
    mount_command(&server, "garage", "enable", 202).await;
    let coordinator = started(&server).await;

    assert!(coordinator.turn_on("garage").await.is_err());
    assert!(!coordinator.view("garage").unwrap().enabled);

    coordinator.shutdown().await;
}

// ── Poll failures ───────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_timeouts_keep_last_known_state() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(true)).await;
    let coordinator = started(&server).await;

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cameras(false))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    for _ in 0..3 {
        let err = coordinator.refresh().await.unwrap_err();
        assert!(err.is_timeout(), "got: {err:?}");
    }

    let freshness = coordinator.observed().freshness();
    assert_eq!(freshness.consecutive_failures, 3);
    assert!(!freshness.last_poll_ok);
    assert_eq!(coordinator.observed().get("front_door"), Some(true));
    assert!(!coordinator.is_available("front_door"));

    coordinator.shutdown().await;
}

// ── Optimistic switch ───────────────────────────────────────────────

#[tokio::test]
async fn test_switch_confirms_after_settle() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(false)).await;
    let coordinator = started(&server).await;
    let switch = OptimisticSwitch::new(coordinator.clone(), "front_door");

    server.reset().await;
    mount_config(&server, cameras(true)).await;
    mount_command(&server, "front_door", "enable", 200).await;

    switch.turn_on().await.unwrap();
    assert_eq!(switch.is_on(), Some(true));
    assert!(switch.assumed().is_some());

    coordinator.wait_idle().await;
    // Well inside the grace period.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(switch.assumed().is_none());
    assert_eq!(switch.is_on(), Some(true));

    coordinator.shutdown().await;
}

// ── One-shot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_oneshot_runs_closure_and_stops() {
    let server = MockServer::start().await;
    mount_config(&server, cameras(true)).await;

    let names = Coordinator::oneshot(config_for(&server), |c| async move {
        Ok(c.views().into_iter().map(|v| v.name).collect::<Vec<_>>())
    })
    .await
    .unwrap();

    assert_eq!(names, vec!["front_door", "garage"]);
}
