//! In-memory storage backend (no persistence)
//!
//! This backend keeps monitors and metrics in process memory.
//! It's useful for:
//! - Testing without database dependencies
//! - Running without a database (`backend = "none"`)
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Linear scans**: Metric queries walk the monitor's log

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{MetricCount, MetricQuery, MonitorFilter, SortOrder, StatusPatch};
use crate::{Metric, Monitor, MonitorId};

#[derive(Default)]
struct Collections {
    /// Monitors in insertion order
    monitors: Vec<Monitor>,

    /// Metric log per monitor, oldest first
    metrics: HashMap<MonitorId, Vec<Metric>>,
}

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<Collections>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_monitor(&self, monitor: &Monitor) -> StorageResult<()> {
        let mut inner = self.inner.write().await;

        if inner.monitors.iter().any(|m| m.url == monitor.url) {
            return Err(StorageError::Duplicate(format!(
                "monitor with URL {} already exists",
                monitor.url
            )));
        }
        if inner.monitors.iter().any(|m| m.id == monitor.id) {
            return Err(StorageError::Duplicate(format!(
                "monitor with id {} already exists",
                monitor.id
            )));
        }

        inner.monitors.push(monitor.clone());
        Ok(())
    }

    async fn find_monitors(&self, filter: MonitorFilter) -> StorageResult<Vec<Monitor>> {
        let inner = self.inner.read().await;
        Ok(inner
            .monitors
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn get_monitor(&self, id: MonitorId) -> StorageResult<Option<Monitor>> {
        let inner = self.inner.read().await;
        Ok(inner.monitors.iter().find(|m| m.id == id).cloned())
    }

    async fn count_monitors(&self, filter: MonitorFilter) -> StorageResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.monitors.iter().filter(|m| filter.matches(m)).count())
    }

    async fn update_monitor_status(
        &self,
        id: MonitorId,
        patch: StatusPatch,
    ) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.monitors.iter_mut().find(|m| m.id == id) {
            Some(monitor) => {
                patch.apply(monitor);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_monitor(&self, id: MonitorId) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.monitors.len();
        inner.monitors.retain(|m| m.id != id);
        let deleted = inner.monitors.len() < before;
        if deleted {
            inner.metrics.remove(&id);
        }
        Ok(deleted)
    }

    async fn insert_metric(&self, metric: &Metric) -> StorageResult<()> {
        let mut inner = self.inner.write().await;

        if !inner.monitors.iter().any(|m| m.id == metric.monitor_id) {
            return Err(StorageError::NotFound(format!(
                "monitor {} does not exist",
                metric.monitor_id
            )));
        }

        inner
            .metrics
            .entry(metric.monitor_id)
            .or_default()
            .push(metric.clone());
        Ok(())
    }

    async fn find_metrics(&self, query: MetricQuery) -> StorageResult<Vec<Metric>> {
        debug!("querying in-memory metrics for {}", query.monitor_id);

        let inner = self.inner.read().await;
        let Some(log) = inner.metrics.get(&query.monitor_id) else {
            return Ok(Vec::new());
        };

        let mut metrics: Vec<Metric> = log
            .iter()
            .filter(|m| m.checked_at >= query.since)
            .cloned()
            .collect();

        metrics.sort_by_key(|m| m.checked_at);
        if query.order == SortOrder::Descending {
            metrics.reverse();
        }
        if let Some(limit) = query.limit {
            metrics.truncate(limit);
        }

        Ok(metrics)
    }

    async fn count_metrics(&self, count: MetricCount) -> StorageResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .metrics
            .get(&count.monitor_id)
            .map(|log| log.iter().filter(|m| count.matches(m)).count())
            .unwrap_or(0))
    }

    async fn cleanup_old_metrics(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut inner = self.inner.write().await;
        let mut deleted = 0;

        for log in inner.metrics.values_mut() {
            let len = log.len();
            log.retain(|m| m.checked_at >= before);
            deleted += len - log.len();
        }

        debug!("deleted {} metrics older than {}", deleted, before);
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let inner = self.inner.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("monitors".to_string(), inner.monitors.len().to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let inner = self.inner.read().await;
        let total_metrics: usize = inner.metrics.values().map(Vec::len).sum();
        Ok(format!(
            "In-Memory: {} monitors, {} metrics",
            inner.monitors.len(),
            total_metrics
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
