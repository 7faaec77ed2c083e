//! API request and response types

use serde::{Deserialize, Serialize};

use crate::service::MetricsSummary;
use crate::{Metric, Monitor, MonitorId};

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when storage is healthy, "degraded" otherwise
    pub status: String,
    pub timestamp: String,
    pub storage: StorageHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
}

/// Response for GET /api/v1/stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub running_jobs: usize,
    pub observers: usize,
    pub probe_slots: ProbeSlots,

    /// Human-readable backend statistics
    pub storage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSlots {
    pub capacity: usize,
    pub in_flight: usize,
}

/// Response for GET /api/v1/monitors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorsResponse {
    pub monitors: Vec<Monitor>,
    pub count: usize,
}

/// Response for DELETE /api/v1/monitors/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: MonitorId,
    pub message: String,
}

/// Query parameters for GET /api/v1/monitors/:id/metrics
///
/// `hours` is kept as text so a malformed value falls back to the default
/// window instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsParams {
    pub hours: Option<String>,
}

impl MetricsParams {
    pub fn hours(&self) -> Option<u32> {
        self.hours.as_deref().and_then(|h| h.trim().parse().ok())
    }
}

/// Response for GET /api/v1/monitors/:id/metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub monitor_id: MonitorId,
    pub hours: u32,
    pub count: usize,
    pub summary: MetricsSummary,

    /// Newest first
    pub metrics: Vec<Metric>,
}
