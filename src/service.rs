//! Monitor service - operations exposed to the request-routing layer
//!
//! `MonitorService` ties the storage backend to the job registry: creating an
//! active monitor starts its loop, deleting a monitor stops its loop before
//! the row is removed.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::actors::JobRegistry;
use crate::config::MonitoringConfig;
use crate::storage::{MetricQuery, MonitorFilter, SortOrder, StorageBackend, StorageError};
use crate::{
    CreateMonitorRequest, Metric, Monitor, MonitorId, MonitorStatus, ProbeStatus, ValidationError,
};

/// Window used when a metrics request asks for an out-of-range lookback
pub const DEFAULT_METRICS_HOURS: u32 = 24;

/// Errors surfaced to callers of the service
#[derive(Debug)]
pub enum ServiceError {
    /// The creation request was malformed
    Validation(ValidationError),

    /// Another monitor already targets this URL
    DuplicateUrl(String),

    /// No monitor with this id
    NotFound(MonitorId),

    /// The storage backend failed
    Storage(StorageError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(err) => write!(f, "{}", err),
            ServiceError::DuplicateUrl(url) => write!(f, "monitor with URL {} already exists", url),
            ServiceError::NotFound(id) => write!(f, "monitor {} not found", id),
            ServiceError::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Validation(err) => Some(err),
            ServiceError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err)
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Summary statistics over a window of metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
    pub uptime_percentage: f64,
    pub average_response: f64,
    pub min_response: u64,
    pub max_response: u64,
}

impl MetricsSummary {
    pub fn from_metrics(metrics: &[Metric]) -> Self {
        let total = metrics.len();
        let successful = metrics
            .iter()
            .filter(|m| m.status == ProbeStatus::Up)
            .count();
        let failed = total - successful;

        let total_response: u64 = metrics.iter().map(|m| m.response_time).sum();
        let average_response = if total == 0 {
            0.0
        } else {
            total_response as f64 / total as f64
        };

        Self {
            total_checks: total,
            successful_checks: successful,
            failed_checks: failed,
            uptime_percentage: crate::actors::uptime_percentage(total, failed),
            average_response,
            min_response: metrics.iter().map(|m| m.response_time).min().unwrap_or(0),
            max_response: metrics.iter().map(|m| m.response_time).max().unwrap_or(0),
        }
    }
}

/// A window of metrics with its summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub monitor_id: MonitorId,
    pub hours: u32,
    pub summary: MetricsSummary,

    /// Newest first
    pub metrics: Vec<Metric>,
}

/// Aggregates over active monitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_monitors: usize,
    pub active_monitors: usize,
    pub up_monitors: usize,
    pub down_monitors: usize,
    pub overall_uptime: f64,
    pub average_response: f64,
}

impl DashboardStats {
    pub fn from_monitors(monitors: &[Monitor]) -> Self {
        let active: Vec<&Monitor> = monitors.iter().filter(|m| m.is_active).collect();
        let count = active.len();

        let up = active
            .iter()
            .filter(|m| m.current_status == MonitorStatus::Up)
            .count();
        let down = active
            .iter()
            .filter(|m| m.current_status == MonitorStatus::Down)
            .count();

        let (overall_uptime, average_response) = if count == 0 {
            (0.0, 0.0)
        } else {
            let uptime: f64 = active.iter().map(|m| m.uptime_percentage).sum();
            let response: u64 = active.iter().map(|m| m.current_response).sum();
            (uptime / count as f64, response as f64 / count as f64)
        };

        Self {
            total_monitors: monitors.len(),
            active_monitors: count,
            up_monitors: up,
            down_monitors: down,
            overall_uptime,
            average_response,
        }
    }
}

/// Monitor lifecycle operations
#[derive(Clone)]
pub struct MonitorService {
    storage: Arc<dyn StorageBackend>,
    registry: JobRegistry,
    config: MonitoringConfig,
}

impl MonitorService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: JobRegistry,
        config: MonitoringConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            config,
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate and persist a monitor, starting its job when active
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn create_monitor(&self, request: CreateMonitorRequest) -> ServiceResult<Monitor> {
        let monitor = request.into_monitor(&self.config.monitor_defaults())?;

        let existing = self
            .storage
            .count_monitors(MonitorFilter::Url(monitor.url.clone()))
            .await?;
        if existing > 0 {
            return Err(ServiceError::DuplicateUrl(monitor.url));
        }

        match self.storage.insert_monitor(&monitor).await {
            Ok(()) => {}
            Err(StorageError::Duplicate(_)) => return Err(ServiceError::DuplicateUrl(monitor.url)),
            Err(e) => return Err(e.into()),
        }

        info!("monitor created: {} ({})", monitor.name, monitor.id);

        if monitor.is_active {
            self.registry.start(monitor.clone()).await;
        }

        Ok(monitor)
    }

    pub async fn list_monitors(&self) -> ServiceResult<Vec<Monitor>> {
        Ok(self.storage.find_monitors(MonitorFilter::All).await?)
    }

    pub async fn get_monitor(&self, id: MonitorId) -> ServiceResult<Monitor> {
        self.storage
            .get_monitor(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Stop a monitor's job and delete it together with its metrics
    #[instrument(skip(self))]
    pub async fn delete_monitor(&self, id: MonitorId) -> ServiceResult<()> {
        self.registry.stop(id).await;

        if !self.storage.delete_monitor(id).await? {
            return Err(ServiceError::NotFound(id));
        }

        info!("monitor deleted: {}", id);
        Ok(())
    }

    /// Metrics of the last `hours` hours, newest first
    ///
    /// Out-of-range windows fall back to 24 hours; the row count is capped
    /// by the monitoring configuration.
    #[instrument(skip(self))]
    pub async fn get_metrics(&self, id: MonitorId, hours: Option<u32>) -> ServiceResult<MetricsReport> {
        let hours = self.clamp_hours(hours);

        if self.storage.get_monitor(id).await?.is_none() {
            return Err(ServiceError::NotFound(id));
        }

        let metrics = self
            .storage
            .find_metrics(MetricQuery {
                monitor_id: id,
                since: Utc::now() - chrono::Duration::hours(hours as i64),
                order: SortOrder::Descending,
                limit: Some(self.config.metrics_max_rows),
            })
            .await?;

        Ok(MetricsReport {
            monitor_id: id,
            hours,
            summary: MetricsSummary::from_metrics(&metrics),
            metrics,
        })
    }

    fn clamp_hours(&self, hours: Option<u32>) -> u32 {
        match hours {
            Some(h) if (1..=self.config.metrics_max_hours).contains(&h) => h,
            _ => DEFAULT_METRICS_HOURS,
        }
    }

    pub async fn dashboard_stats(&self) -> ServiceResult<DashboardStats> {
        let monitors = self.storage.find_monitors(MonitorFilter::All).await?;
        Ok(DashboardStats::from_monitors(&monitors))
    }

    /// Start one job per active monitor
    pub async fn start_monitoring(&self) -> ServiceResult<usize> {
        Ok(self.registry.start_all_active(self.storage.as_ref()).await?)
    }
}
