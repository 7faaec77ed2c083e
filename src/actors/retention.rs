//! Retention sweeper - deletes metrics older than the retention period
//!
//! Runs once at startup and then daily until cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::storage::StorageBackend;

/// Cleanup interval - run retention cleanup daily
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Delete metrics older than `retention_days`, returning how many were removed
#[instrument(skip(storage))]
pub async fn run_cleanup(storage: &dyn StorageBackend, retention_days: u32) -> usize {
    let Some(cutoff) = chrono::Duration::try_days(retention_days.into())
        .and_then(|window| Utc::now().checked_sub_signed(window))
    else {
        error!("retention of {} days is out of range, skipping cleanup", retention_days);
        return 0;
    };

    match storage.cleanup_old_metrics(cutoff).await {
        Ok(deleted) => {
            if deleted > 0 {
                info!(
                    "retention cleanup deleted {} metrics older than {}",
                    deleted, cutoff
                );
            } else {
                debug!("retention cleanup found nothing to delete");
            }
            deleted
        }
        Err(e) => {
            error!("retention cleanup failed: {}", e);
            0
        }
    }
}

/// Spawn the periodic sweeper
///
/// The first tick of the interval fires immediately, which gives the startup
/// cleanup.
pub fn spawn_retention(
    storage: Arc<dyn StorageBackend>,
    retention_days: u32,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "metric retention enabled: {} days, sweeping every {:?}",
            retention_days, every
        );

        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    run_cleanup(storage.as_ref(), retention_days).await;
                }
            }
        }

        debug!("retention sweeper stopped");
    })
}
