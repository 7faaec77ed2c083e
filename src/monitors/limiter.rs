//! Global admission gate bounding how many probes run at once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate shared by every scheduling loop.
///
/// Cloning shares the same slots. Waiters are served in FIFO order by the
/// underlying semaphore.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held probe slot, released when dropped.
#[derive(Debug)]
pub struct ProbePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a limiter admitting at most `capacity` concurrent probes.
    ///
    /// A capacity of zero is raised to one, as nothing could ever run otherwise.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free and takes it.
    ///
    /// Returns `None` once the limiter has been closed.
    pub async fn acquire(&self) -> Option<ProbePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(ProbePermit { _permit: permit })
    }

    /// Wakes every waiter with `None` and refuses further acquisitions.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of probes currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }
}
