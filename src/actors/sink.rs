//! ResultSink - Records probe outcomes
//!
//! For every completed probe the sink:
//!
//! 1. Appends a [`Metric`] to the log (failures are logged and swallowed)
//! 2. Recomputes the rolling uptime from the log over the uptime window
//! 3. Writes the monitor's cached status fields in one conditional update
//! 4. Publishes a `metric_update` event to the hub without waiting
//!
//! Nothing here returns an error to the scheduling loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

use super::hub::HubHandle;
use super::messages::{MonitorUpdate, UpdateEvent};
use crate::monitors::ProbeOutcome;
use crate::storage::{MetricCount, StatusPatch, StorageBackend};
use crate::{Metric, Monitor, MonitorId, ProbeStatus};

/// Uptime as `(total - down) / total * 100`, or 100 when there are no samples
pub fn uptime_percentage(total: usize, down: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let down = down.min(total);
    (total - down) as f64 / total as f64 * 100.0
}

/// Persists outcomes, refreshes cached status and publishes updates
#[derive(Clone)]
pub struct ResultSink {
    storage: Arc<dyn StorageBackend>,
    hub: HubHandle,
    uptime_window: chrono::Duration,
}

impl ResultSink {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        hub: HubHandle,
        uptime_window: chrono::Duration,
    ) -> Self {
        Self {
            storage,
            hub,
            uptime_window,
        }
    }

    /// Record one probe outcome for a monitor
    #[instrument(skip_all, fields(monitor_id = %monitor.id))]
    pub async fn record(&self, monitor: &Monitor, outcome: ProbeOutcome) -> MonitorUpdate {
        let checked_at = Utc::now();

        match outcome.status {
            ProbeStatus::Up => debug!(
                "{} is UP ({} in {}ms)",
                monitor.url, outcome.status_code, outcome.response_time_ms
            ),
            ProbeStatus::Down => warn!(
                "{} is DOWN (code {}, {}ms{})",
                monitor.url,
                outcome.status_code,
                outcome.response_time_ms,
                outcome
                    .error
                    .as_deref()
                    .map(|e| format!(", {e}"))
                    .unwrap_or_default()
            ),
        }

        let metric = Metric {
            monitor_id: monitor.id,
            url: monitor.url.clone(),
            status: outcome.status,
            status_code: outcome.status_code,
            response_time: outcome.response_time_ms,
            error: outcome.error.clone(),
            checked_at,
        };

        if let Err(e) = self.storage.insert_metric(&metric).await {
            error!("failed to store metric: {}", e);
        }

        let uptime = self.compute_uptime(monitor.id, checked_at).await;

        let patch = StatusPatch {
            status: outcome.status.into(),
            status_code: outcome.status_code,
            response_time: outcome.response_time_ms,
            last_checked: checked_at,
            uptime_percentage: uptime,
        };

        match self.storage.update_monitor_status(monitor.id, patch).await {
            Ok(true) => {}
            Ok(false) => debug!("monitor no longer exists, status not updated"),
            Err(e) => error!("failed to update monitor status: {}", e),
        }

        let update = MonitorUpdate {
            monitor_id: monitor.id,
            status: outcome.status.into(),
            status_code: outcome.status_code,
            response_time: outcome.response_time_ms,
            url: monitor.url.clone(),
            error: outcome.error,
            timestamp: checked_at,
            uptime_percentage: uptime,
        };

        self.hub.publish(UpdateEvent::metric_update(update.clone()));

        update
    }

    /// Uptime over the trailing window, 100 when unknown
    async fn compute_uptime(&self, monitor_id: MonitorId, now: DateTime<Utc>) -> f64 {
        let since = now - self.uptime_window;

        let total = self
            .storage
            .count_metrics(MetricCount {
                monitor_id,
                since,
                status: None,
            })
            .await;
        let down = self
            .storage
            .count_metrics(MetricCount {
                monitor_id,
                since,
                status: Some(ProbeStatus::Down),
            })
            .await;

        match (total, down) {
            (Ok(total), Ok(down)) => uptime_percentage(total, down),
            (Err(e), _) | (_, Err(e)) => {
                warn!("failed to count metrics for uptime: {}", e);
                100.0
            }
        }
    }
}
