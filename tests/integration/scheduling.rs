//! End-to-end scheduling tests
//!
//! These tests verify that:
//! - Active monitors are probed immediately and their results persisted
//! - Cached status and uptime follow the recorded outcomes
//! - Deleting a monitor stops its probes
//! - Updates reach hub subscribers

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use pretty_assertions::assert_eq;
use pulsewatch::{
    CreateMonitorRequest, MonitorStatus, ProbeStatus,
    actors::UpdateEvent,
    service::ServiceError,
    storage::{MetricQuery, SortOrder},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::helpers::{create_memory_pipeline, create_monitor_request, eventually};

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|r| r.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_healthy_monitor_is_recorded_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    let monitor = pipeline
        .service
        .create_monitor(create_monitor_request(&format!("{}/health", server.uri()), 60))
        .await
        .unwrap();

    let storage = pipeline.storage.clone();
    let id = monitor.id;
    let probed = eventually(Duration::from_secs(5), || {
        let storage = storage.clone();
        async move {
            let monitor = storage.get_monitor(id).await.unwrap().unwrap();
            monitor.current_status == MonitorStatus::Up
        }
    })
    .await;
    assert!(probed, "monitor never reported up");

    let cached = pipeline.service.get_monitor(id).await.unwrap();
    assert_eq!(cached.current_status_code, 200);
    assert_eq!(cached.uptime_percentage, 100.0);
    assert!(cached.last_checked.is_some());

    let metrics = pipeline
        .storage
        .find_metrics(MetricQuery {
            monitor_id: id,
            since: Utc::now() - chrono::Duration::hours(1),
            order: SortOrder::Descending,
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].status, ProbeStatus::Up);
    assert_eq!(metrics[0].url, monitor.url);
    assert_eq!(metrics[0].error, None);

    pipeline.registry.shutdown().await;
}

#[tokio::test]
async fn test_failing_monitor_is_recorded_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    let monitor = pipeline
        .service
        .create_monitor(create_monitor_request(&format!("{}/broken", server.uri()), 60))
        .await
        .unwrap();

    let service = pipeline.service.clone();
    let id = monitor.id;
    let probed = eventually(Duration::from_secs(5), || {
        let service = service.clone();
        async move {
            service.get_monitor(id).await.unwrap().current_status == MonitorStatus::Down
        }
    })
    .await;
    assert!(probed, "monitor never reported down");

    let cached = pipeline.service.get_monitor(id).await.unwrap();
    assert_eq!(cached.current_status_code, 503);
    assert_eq!(cached.uptime_percentage, 0.0);

    let report = pipeline.service.get_metrics(id, None).await.unwrap();
    assert_eq!(report.summary.total_checks, 1);
    assert_eq!(report.summary.failed_checks, 1);

    pipeline.registry.shutdown().await;
}

#[tokio::test]
async fn test_monitor_is_probed_every_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    pipeline
        .service
        .create_monitor(create_monitor_request(&server.uri(), 1))
        .await
        .unwrap();

    let repeated = eventually(Duration::from_secs(5), || async {
        request_count(&server).await >= 3
    })
    .await;
    assert!(repeated, "monitor was not probed repeatedly");

    pipeline.registry.shutdown().await;
}

#[tokio::test]
async fn test_delete_stops_probes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    let monitor = pipeline
        .service
        .create_monitor(create_monitor_request(&server.uri(), 1))
        .await
        .unwrap();

    assert!(eventually(Duration::from_secs(5), || async { request_count(&server).await >= 1 }).await);

    pipeline.service.delete_monitor(monitor.id).await.unwrap();
    assert!(!pipeline.registry.is_running(monitor.id).await);

    let after_delete = request_count(&server).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(request_count(&server).await, after_delete);

    assert_matches!(
        pipeline.service.get_monitor(monitor.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn test_inactive_monitor_is_not_scheduled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    let monitor = pipeline
        .service
        .create_monitor(CreateMonitorRequest {
            is_active: Some(false),
            ..create_monitor_request(&server.uri(), 1)
        })
        .await
        .unwrap();

    assert!(!pipeline.registry.is_running(monitor.id).await);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_start_monitoring_resumes_active_monitors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let first = create_memory_pipeline();
    let monitor = first
        .service
        .create_monitor(CreateMonitorRequest {
            is_active: Some(false),
            ..create_monitor_request(&format!("{}/a", server.uri()), 60)
        })
        .await
        .unwrap();
    first
        .service
        .create_monitor(create_monitor_request(&format!("{}/b", server.uri()), 60))
        .await
        .unwrap();
    first.registry.shutdown().await;

    // a second pipeline over the same storage picks up the active monitor only
    let second = crate::helpers::create_pipeline(first.storage.clone(), 10);
    let started = second.service.start_monitoring().await.unwrap();
    assert_eq!(started, 1);
    assert!(!second.registry.is_running(monitor.id).await);

    second.registry.shutdown().await;
}

#[tokio::test]
async fn test_updates_reach_hub_subscribers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_memory_pipeline();
    let (_id, mut events) = pipeline.hub.subscribe(16).await;

    // greeting comes first
    assert_matches!(
        events.recv().await,
        Some(UpdateEvent::ConnectionEstablished { .. })
    );

    let monitor = pipeline
        .service
        .create_monitor(create_monitor_request(&server.uri(), 60))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no update published")
        .unwrap();

    assert_matches!(event, UpdateEvent::MetricUpdate { monitor_id, data } => {
        assert_eq!(monitor_id, monitor.id);
        assert_eq!(data.status, MonitorStatus::Up);
        assert_eq!(data.status_code, 200);
        assert_eq!(data.url, monitor.url);
        assert_eq!(data.uptime_percentage, 100.0);
    });

    pipeline.registry.shutdown().await;
}
