//! Query, filter and patch types shared by all storage backends
//!
//! Backends expose a narrow set-oriented surface (insert, find, update,
//! count, delete). These types describe the filters and patches those
//! operations accept, so every backend answers the same questions the
//! same way.

use chrono::{DateTime, Utc};

use crate::{Metric, Monitor, MonitorId, MonitorStatus, ProbeStatus};

/// Filter over the monitors collection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MonitorFilter {
    #[default]
    All,

    /// Only monitors flagged active
    Active,

    /// The monitor with the given target URL
    Url(String),
}

impl MonitorFilter {
    pub fn matches(&self, monitor: &Monitor) -> bool {
        match self {
            MonitorFilter::All => true,
            MonitorFilter::Active => monitor.is_active,
            MonitorFilter::Url(url) => monitor.url == *url,
        }
    }
}

/// Patch applied to a monitor's cached status fields after a probe
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPatch {
    pub status: MonitorStatus,
    pub status_code: u16,
    pub response_time: u64,
    pub last_checked: DateTime<Utc>,
    pub uptime_percentage: f64,
}

impl StatusPatch {
    pub fn apply(&self, monitor: &mut Monitor) {
        monitor.current_status = self.status;
        monitor.current_status_code = self.status_code;
        monitor.current_response = self.response_time;
        monitor.last_checked = Some(self.last_checked);
        monitor.uptime_percentage = self.uptime_percentage;
        monitor.updated_at = Utc::now();
    }
}

/// Sort order for metric queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Query parameters for fetching a monitor's metric log
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub monitor_id: MonitorId,

    /// Start of time range (inclusive)
    pub since: DateTime<Utc>,

    /// Ordering by `checked_at`
    pub order: SortOrder,

    /// Maximum number of results to return
    pub limit: Option<usize>,
}

/// Count parameters over a monitor's metric log
#[derive(Debug, Clone)]
pub struct MetricCount {
    pub monitor_id: MonitorId,

    /// Start of time range (inclusive)
    pub since: DateTime<Utc>,

    /// Only count metrics with this status
    pub status: Option<ProbeStatus>,
}

impl MetricCount {
    pub fn matches(&self, metric: &Metric) -> bool {
        metric.monitor_id == self.monitor_id
            && metric.checked_at >= self.since
            && self.status.is_none_or(|s| metric.status == s)
    }
}
