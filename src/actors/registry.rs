//! JobRegistry - At most one scheduling loop per monitor
//!
//! The registry maps monitor ids to running [`SchedulerLoop`] tasks. All
//! mutations (start, replace, stop, shutdown) happen under one exclusive lock.
//!
//! ## Replacement
//!
//! Starting a monitor that already has a loop cancels the old loop's token
//! and installs the new entry in the same critical section. The new loop
//! receives the old loop's task handle and awaits it before its first probe,
//! so the two can never probe the same monitor concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::scheduler::{JobContext, SchedulerLoop};
use crate::storage::{MonitorFilter, StorageBackend, StorageResult};
use crate::{Monitor, MonitorId};

struct JobEntry {
    token: CancellationToken,
    handle: JoinHandle<()>,
    generation: u64,
}

#[derive(Default)]
struct Jobs {
    entries: HashMap<MonitorId, JobEntry>,
    next_generation: u64,
}

/// Owned registry of running scheduling loops
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<Mutex<Jobs>>,

    ctx: JobContext,

    /// Parent of every loop token
    root: CancellationToken,
}

impl JobRegistry {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Jobs::default())),
            ctx,
            root: CancellationToken::new(),
        }
    }

    /// Start (or replace) the loop for a monitor, returning its generation
    #[instrument(skip(self, monitor), fields(monitor_id = %monitor.id))]
    pub async fn start(&self, monitor: Monitor) -> u64 {
        let id = monitor.id;
        let mut jobs = self.jobs.lock().await;

        let generation = jobs.next_generation;
        jobs.next_generation += 1;

        let predecessor = jobs.entries.remove(&id).map(|old| {
            old.token.cancel();
            info!(
                "replacing job for {} (generation {} -> {})",
                monitor.url, old.generation, generation
            );
            old.handle
        });
        if predecessor.is_none() {
            info!("starting job for {} every {}s", monitor.url, monitor.interval);
        }

        let token = self.root.child_token();
        let job = SchedulerLoop::new(monitor, self.ctx.clone(), token.clone(), predecessor);
        let handle = tokio::spawn(job.run());

        jobs.entries.insert(
            id,
            JobEntry {
                token,
                handle,
                generation,
            },
        );

        generation
    }

    /// Cancel and remove a monitor's loop
    ///
    /// Returns `false` if no loop was registered for the id.
    #[instrument(skip(self))]
    pub async fn stop(&self, id: MonitorId) -> bool {
        let mut jobs = self.jobs.lock().await;
        match jobs.entries.remove(&id) {
            Some(entry) => {
                entry.token.cancel();
                info!("stopped job (generation {})", entry.generation);
                true
            }
            None => {
                debug!("no job to stop");
                false
            }
        }
    }

    /// Start one loop per active monitor in storage
    pub async fn start_all_active(&self, storage: &dyn StorageBackend) -> StorageResult<usize> {
        let monitors = storage.find_monitors(MonitorFilter::Active).await?;
        let count = monitors.len();

        for monitor in monitors {
            self.start(monitor).await;
        }

        info!("started {} monitoring jobs", count);
        Ok(count)
    }

    pub async fn is_running(&self, id: MonitorId) -> bool {
        let jobs = self.jobs.lock().await;
        jobs.entries
            .get(&id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    /// Generation of the loop currently registered for a monitor
    pub async fn generation(&self, id: MonitorId) -> Option<u64> {
        let jobs = self.jobs.lock().await;
        jobs.entries.get(&id).map(|entry| entry.generation)
    }

    pub async fn running_count(&self) -> usize {
        let jobs = self.jobs.lock().await;
        jobs.entries
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    /// Shared probe limiter, exposed for runtime stats
    pub fn limiter(&self) -> &crate::monitors::ConcurrencyLimiter {
        &self.ctx.limiter
    }

    /// Cancel every loop and wait for them to finish
    pub async fn shutdown(&self) {
        let entries: Vec<JobEntry> = {
            let mut jobs = self.jobs.lock().await;
            jobs.entries.drain().map(|(_, entry)| entry).collect()
        };

        info!("stopping {} monitoring jobs", entries.len());
        self.root.cancel();

        for entry in entries {
            if let Err(e) = entry.handle.await {
                warn!("monitoring job ended abnormally: {}", e);
            }
        }
    }
}
