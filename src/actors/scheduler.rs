//! SchedulerLoop - Drives periodic probes for one monitor
//!
//! ## Message Flow
//!
//! ```text
//! start → [await predecessor] → probe → tick → probe → tick → ...
//!                                 ↑
//!                                 └─── cancellation (checked with every wait)
//! ```
//!
//! Each tick acquires a limiter slot, runs the probe, releases the slot and
//! hands the outcome to the result sink. A loop that is cancelled while a
//! probe is in flight lets the probe finish but discards its outcome.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::sink::ResultSink;
use crate::Monitor;
use crate::monitors::{ConcurrencyLimiter, ProbeExecutor};

/// Collaborators shared by every scheduling loop
#[derive(Clone)]
pub struct JobContext {
    pub executor: ProbeExecutor,
    pub limiter: ConcurrencyLimiter,
    pub sink: ResultSink,
}

/// Periodic driver for a single monitor
pub struct SchedulerLoop {
    monitor: Monitor,

    ctx: JobContext,

    token: CancellationToken,

    /// Task of the loop this one replaces, awaited before the first probe
    predecessor: Option<JoinHandle<()>>,
}

impl SchedulerLoop {
    pub fn new(
        monitor: Monitor,
        ctx: JobContext,
        token: CancellationToken,
        predecessor: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            monitor,
            ctx,
            token,
            predecessor,
        }
    }

    /// Run the loop until its token is cancelled
    #[instrument(skip(self), fields(monitor_id = %self.monitor.id, url = %self.monitor.url))]
    pub async fn run(mut self) {
        if let Some(previous) = self.predecessor.take() {
            debug!("waiting for replaced loop to finish");
            let _ = previous.await;
        }

        if self.token.is_cancelled() {
            return;
        }

        debug!("scheduler loop started, interval {}s", self.monitor.interval);

        let mut ticker = time::interval(Duration::from_secs(self.monitor.interval.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the first tick completes immediately, giving the initial probe
        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                _ = ticker.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
            }
        }

        debug!("scheduler loop stopped");
    }

    /// One probe through the limiter; `false` once the loop should stop
    async fn tick(&self) -> bool {
        let permit = tokio::select! {
            biased;

            _ = self.token.cancelled() => return false,

            permit = self.ctx.limiter.acquire() => match permit {
                Some(permit) => permit,
                None => {
                    debug!("limiter closed");
                    return false;
                }
            },
        };

        let outcome = self.ctx.executor.execute(&self.monitor).await;
        drop(permit);

        if self.token.is_cancelled() {
            debug!("loop cancelled during probe, discarding outcome");
            return false;
        }

        self.ctx.sink.record(&self.monitor, outcome).await;
        true
    }
}
