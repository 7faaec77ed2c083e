//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::{MetricCount, MetricQuery, MonitorFilter, StatusPatch};
use crate::{Metric, Monitor, MonitorId};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for storage backends
///
/// The scheduler only relies on this narrow, set-oriented surface over two
/// collections: monitor definitions (with their cached status) and the
/// append-only metric log.
///
/// ## Guarantees expected from implementations
///
/// - Monitor URLs are unique: inserting a second monitor with the same URL
///   fails with `StorageError::Duplicate`.
/// - A metric is only accepted while its monitor exists; otherwise
///   `insert_metric` fails with `StorageError::NotFound`.
/// - Deleting a monitor removes its metric log.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared by every
/// scheduling loop and the API handlers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // ========================================================================
    // Monitors
    // ========================================================================

    /// Insert a new monitor
    async fn insert_monitor(&self, monitor: &Monitor) -> StorageResult<()>;

    /// Find monitors matching a filter, ordered by creation time
    async fn find_monitors(&self, filter: MonitorFilter) -> StorageResult<Vec<Monitor>>;

    /// Get a single monitor by id
    async fn get_monitor(&self, id: MonitorId) -> StorageResult<Option<Monitor>>;

    /// Count monitors matching a filter
    async fn count_monitors(&self, filter: MonitorFilter) -> StorageResult<usize>;

    /// Conditionally update the cached status fields of a monitor
    ///
    /// Returns `false` when no monitor with that id exists.
    async fn update_monitor_status(&self, id: MonitorId, patch: StatusPatch)
    -> StorageResult<bool>;

    /// Delete a monitor (and its metrics)
    ///
    /// Returns `false` when no monitor with that id exists.
    async fn delete_monitor(&self, id: MonitorId) -> StorageResult<bool>;

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Append a probe outcome to the metric log
    async fn insert_metric(&self, metric: &Metric) -> StorageResult<()>;

    /// Query a monitor's metrics since a point in time
    async fn find_metrics(&self, query: MetricQuery) -> StorageResult<Vec<Metric>>;

    /// Count a monitor's metrics since a point in time
    async fn count_metrics(&self, count: MetricCount) -> StorageResult<usize>;

    /// Delete metrics older than the specified timestamp
    ///
    /// Used for retention policy enforcement. Returns the number of
    /// metrics deleted.
    async fn cleanup_old_metrics(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    // ========================================================================
    // Housekeeping
    // ========================================================================

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    ///
    /// Returns human-readable stats about the backend
    /// (e.g., "SQLite: 12 monitors, 1.2M metrics, 450MB on disk").
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
