//! Bounded admission for job pipelines.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounds how many job pipelines run simultaneously.
///
/// The capacity mirrors the broker-side prefetch count, so the number of
/// unacknowledged in-flight deliveries can never exceed local capacity.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `capacity` pipelines (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Block until a slot is free; the returned permit holds the slot for
    /// the lifetime of the pipeline task.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until every slot has been released.
    pub async fn wait_idle(&self) {
        loop {
            if self.available() == self.capacity {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }
}
