//! Integration tests for SQLite persistence
//!
//! These tests verify that:
//! - Monitors and metrics survive a backend restart
//! - Recorded probes update the cached status on disk
//! - Retention removes expired metrics only

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use pulsewatch::{
    Metric, MonitorStatus, ProbeStatus,
    actors::retention::run_cleanup,
    config::StorageConfig,
    storage::{self, MetricCount, MonitorFilter},
};
use tempfile::tempdir;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

use crate::helpers::{create_monitor_request, create_pipeline, eventually};

fn sqlite_config(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig::Sqlite {
        path: dir.path().join("pulsewatch.db"),
        retention_days: 30,
    }
}

#[tokio::test]
async fn test_monitors_survive_restart() {
    let dir = tempdir().unwrap();
    let config = sqlite_config(&dir);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let monitor = {
        let storage = storage::open(&config).await.unwrap();
        let pipeline = create_pipeline(Arc::clone(&storage), 10);

        let monitor = pipeline
            .service
            .create_monitor(create_monitor_request(&server.uri(), 60))
            .await
            .unwrap();

        let service = pipeline.service.clone();
        let id = monitor.id;
        assert!(
            eventually(Duration::from_secs(5), || {
                let service = service.clone();
                async move { service.get_monitor(id).await.unwrap().last_checked.is_some() }
            })
            .await
        );

        pipeline.registry.shutdown().await;
        storage.close().await.unwrap();
        monitor
    };

    let storage = storage::open(&config).await.unwrap();
    let restored = storage.get_monitor(monitor.id).await.unwrap().unwrap();

    assert_eq!(restored.url, monitor.url);
    assert_eq!(restored.name, monitor.name);
    assert_eq!(restored.interval, 60);
    assert_eq!(restored.current_status, MonitorStatus::Up);
    assert_eq!(restored.current_status_code, 200);

    let metrics = storage
        .count_metrics(MetricCount {
            monitor_id: monitor.id,
            since: Utc::now() - chrono::Duration::hours(1),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(metrics, 1);

    storage.close().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_url_rejected_across_restart() {
    let dir = tempdir().unwrap();
    let config = sqlite_config(&dir);

    {
        let storage = storage::open(&config).await.unwrap();
        let pipeline = create_pipeline(Arc::clone(&storage), 10);
        pipeline
            .service
            .create_monitor(pulsewatch::CreateMonitorRequest {
                is_active: Some(false),
                ..create_monitor_request("https://example.com/health", 30)
            })
            .await
            .unwrap();
        storage.close().await.unwrap();
    }

    let storage = storage::open(&config).await.unwrap();
    let pipeline = create_pipeline(Arc::clone(&storage), 10);

    let result = pipeline
        .service
        .create_monitor(create_monitor_request("https://example.com/health", 30))
        .await;
    assert!(matches!(
        result,
        Err(pulsewatch::service::ServiceError::DuplicateUrl(_))
    ));
    assert_eq!(storage.count_monitors(MonitorFilter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_retention_removes_only_expired_metrics() {
    let dir = tempdir().unwrap();
    let storage = storage::open(&sqlite_config(&dir)).await.unwrap();
    let pipeline = create_pipeline(Arc::clone(&storage), 10);

    let monitor = pipeline
        .service
        .create_monitor(pulsewatch::CreateMonitorRequest {
            is_active: Some(false),
            ..create_monitor_request("https://example.com/", 30)
        })
        .await
        .unwrap();

    let metric = |age_days: i64| Metric {
        monitor_id: monitor.id,
        url: monitor.url.clone(),
        status: ProbeStatus::Up,
        status_code: 200,
        response_time: 42,
        error: None,
        checked_at: Utc::now() - chrono::Duration::days(age_days),
    };

    storage.insert_metric(&metric(45)).await.unwrap();
    storage.insert_metric(&metric(31)).await.unwrap();
    storage.insert_metric(&metric(1)).await.unwrap();

    let removed = run_cleanup(storage.as_ref(), 30).await;
    assert_eq!(removed, 2);

    let remaining = storage
        .count_metrics(MetricCount {
            monitor_id: monitor.id,
            since: Utc::now() - chrono::Duration::days(365),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
