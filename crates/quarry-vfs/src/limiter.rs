use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::Cancelled;

/// Bounded-concurrency gate for file system reads.
///
/// The limiter is an explicitly constructed value: whoever builds the
/// [`crate::FileContentCache`] decides the bound and may share one limiter between several
/// caches by cloning it (clones share the same slots).
#[derive(Debug, Clone)]
pub struct IoLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied I/O slot. The slot is released when the permit is dropped, which covers
/// every exit path including unwinding.
#[derive(Debug)]
#[must_use = "the I/O slot is released as soon as the permit is dropped"]
pub struct IoPermit {
    _permit: OwnedSemaphorePermit,
}

impl IoLimiter {
    /// Default number of concurrent reads.
    pub const DEFAULT_CAPACITY: usize = 128;

    /// Creates a limiter with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free slot, or fails with [`Cancelled`] once `cancel` fires.
    ///
    /// No slot is consumed on cancellation. An already-cancelled token fails immediately,
    /// even when slots are free.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<IoPermit, Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => Ok(IoPermit { _permit: permit }),
                // The semaphore is never closed while a limiter handle exists.
                Err(_closed) => Err(Cancelled),
            },
        }
    }
}

impl Default for IoLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
