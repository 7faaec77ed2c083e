//! Probe outcome classification against real sockets

use std::time::Duration;

use pretty_assertions::assert_eq;
use pulsewatch::{
    CreateMonitorRequest, HttpMethod, MonitorDefaults, ProbeStatus, monitors::ProbeExecutor,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::helpers::unused_local_url;

fn monitor(url: &str, method: HttpMethod, timeout: u64) -> pulsewatch::Monitor {
    CreateMonitorRequest {
        url: url.to_string(),
        method: Some(method),
        timeout: Some(timeout),
        ..Default::default()
    }
    .into_monitor(&MonitorDefaults::default())
    .unwrap()
}

#[tokio::test]
async fn test_success_status_is_up() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&format!("{}/ok", server.uri()), HttpMethod::Head, 5))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Up);
    assert_eq!(outcome.status_code, 204);
    assert_eq!(outcome.error, None);
}

#[tokio::test]
async fn test_redirect_status_is_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&server.uri(), HttpMethod::Get, 5))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Up);
    assert_eq!(outcome.status_code, 304);
}

#[tokio::test]
async fn test_server_error_is_down_without_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&server.uri(), HttpMethod::Get, 5))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Down);
    assert_eq!(outcome.status_code, 500);
    assert_eq!(outcome.error, None);
}

#[tokio::test]
async fn test_client_error_is_down() {
    let server = MockServer::start().await;

    // nothing mounted, wiremock answers 404
    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&server.uri(), HttpMethod::Get, 5))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Down);
    assert_eq!(outcome.status_code, 404);
}

#[tokio::test]
async fn test_connection_refused_is_down_with_error() {
    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&unused_local_url(), HttpMethod::Get, 5))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Down);
    assert_eq!(outcome.status_code, 0);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let executor = ProbeExecutor::new().unwrap();
    let outcome = executor
        .execute(&monitor(&server.uri(), HttpMethod::Get, 1))
        .await;

    assert_eq!(outcome.status, ProbeStatus::Down);
    assert_eq!(outcome.status_code, 0);
    assert!(outcome.error.is_some());
    assert!(outcome.response_time_ms >= 900);
    assert!(outcome.response_time_ms < 3000);
}
