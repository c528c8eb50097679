// Integration tests: HTTP and WebSocket endpoints

mod common;

use std::sync::Arc;

use axum_test::TestServer;
use common::{T0, feed, test_config};
use tierstat::config::{EngineConfig, default_signal_thresholds};
use tierstat::engine::Engine;
use tierstat::models::{CurrentResponse, Tier};
use tierstat::routes::{self, Engines};

fn test_engines() -> Engines {
    let pressure = Engine::new("pressure", test_config("unused-pressure.json"));
    feed(&pressure, T0, 10.0, 97, |i| if i == 90 { 95.0 } else { 20.0 });

    let mut signal_config = EngineConfig::with_snapshot_path("unused-signal.json");
    signal_config.sample_interval_secs = 1;
    signal_config.thresholds = default_signal_thresholds();
    let signal = Engine::new("signal", signal_config);

    Engines::from([
        ("pressure".to_string(), Arc::new(pressure)),
        ("signal".to_string(), Arc::new(signal)),
    ])
}

fn test_server() -> TestServer {
    TestServer::new(routes::app(test_engines()))
}

/// Build TestServer with http_transport (required for WebSocket tests).
fn test_server_with_http() -> TestServer {
    TestServer::builder()
        .http_transport()
        .build(routes::app(test_engines()))
}

#[tokio::test]
async fn test_root_endpoint() {
    let server = test_server();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("tierstat: tiered telemetry history");
}

#[tokio::test]
async fn test_version_endpoint() {
    let server = test_server();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("tierstat"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_domains_endpoint() {
    let server = test_server();
    let response = server.get("/api/domains").await;
    response.assert_status_ok();
    let domains: Vec<String> = response.json();
    assert_eq!(domains, vec!["pressure".to_string(), "signal".to_string()]);
}

#[tokio::test]
async fn test_history_endpoint_per_period() {
    let server = test_server();
    for (period, tier, len) in [
        ("finest", "finest", 60),
        ("hourly", "hourly", 16),
        ("weekly", "weekly", 0),
    ] {
        let response = server
            .get("/api/pressure/history")
            .add_query_param("period", period)
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["domain"], "pressure");
        assert_eq!(json["period"], tier);
        // Weekly is age-filtered against the real clock; the fixture data is from 2023.
        assert_eq!(json["samples"].as_array().unwrap().len(), len, "{period}");
        assert!(json["gaps"]["has_gaps"].is_boolean());
    }
}

#[tokio::test]
async fn test_history_endpoint_stats_and_spikes() {
    let server = test_server();
    let json: serde_json::Value = server
        .get("/api/pressure/history")
        .add_query_param("period", "finest")
        .await
        .json();
    assert_eq!(json["stats"]["sample_count"], 60);
    assert_eq!(json["stats"]["metrics"]["cpu"]["max"], 95.0);
    assert_eq!(json["stats"]["event_count"], 1);
    assert_eq!(json["spikes"][0]["metric"], "cpu");
    assert_eq!(json["spikes"][0]["severity"], "critical");
    assert_eq!(json["time_span"]["start_epoch"], T0 + 370.0);
}

#[tokio::test]
async fn test_history_endpoint_unknown_or_missing_period_is_finest() {
    let server = test_server();
    let json: serde_json::Value = server
        .get("/api/pressure/history")
        .add_query_param("period", "fortnight")
        .await
        .json();
    assert_eq!(json["period"], Tier::Finest.as_str());
    let json: serde_json::Value = server.get("/api/pressure/history").await.json();
    assert_eq!(json["period"], "finest");
}

#[tokio::test]
async fn test_unknown_domain_is_404() {
    let server = test_server();
    let response = server.get("/api/disk/history").expect_failure().await;
    response.assert_status_not_found();
    let json: serde_json::Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("disk"));
    server
        .get("/api/disk/current")
        .expect_failure()
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_current_endpoint() {
    let server = test_server();
    let response = server.get("/api/pressure/current").await;
    response.assert_status_ok();
    let current: serde_json::Value = response.json();
    assert_eq!(current["domain"], "pressure");
    assert_eq!(current["current_sample"]["epoch"], T0 + 960.0);
    assert_eq!(current["thresholds"]["cpu"]["critical"], 90.0);
    assert_eq!(current["thresholds"]["cpu"]["direction"], "above");

    let empty: serde_json::Value = server.get("/api/signal/current").await.json();
    assert!(empty["current_sample"].is_null());
    assert_eq!(empty["thresholds"]["link_quality"]["direction"], "below");
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_streams_current() {
    let server = test_server_with_http();
    let mut ws = server
        .get_websocket("/ws/pressure")
        .await
        .into_websocket()
        .await;
    let current: CurrentResponse = receive_first_json_text(&mut ws).await;
    assert_eq!(current.domain, "pressure");
    assert_eq!(current.current_sample.unwrap().epoch, T0 + 960.0);
}

#[tokio::test]
async fn test_ws_streams_repeatedly() {
    let server = test_server_with_http();
    let mut ws = server.get_websocket("/ws/signal").await.into_websocket().await;
    for _ in 0..2 {
        let current: CurrentResponse = receive_first_json_text(&mut ws).await;
        assert_eq!(current.domain, "signal");
        assert!(current.current_sample.is_none());
    }
}
