//! Process-wide admission control for transcoder invocations.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use ap_core::{Error, Result};

/// Bounded counting gate limiting how many jobs may run a transcoder
/// process at once.
///
/// Capacity is fixed at construction for the process lifetime.  Waiters
/// suspend cooperatively (no polling) and are queued FIFO by the underlying
/// [`Semaphore`], so a freed permit cannot bypass existing waiters
/// indefinitely.
///
/// Cloning shares the same permit pool.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held unit of gate capacity.
///
/// The permit is released when dropped, so acquisition is scoped: every
/// exit path of the holding job — success, failure, cancellation, panic —
/// releases exactly once.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` concurrent holders.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("concurrency capacity must be at least 1"));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// The fixed capacity N.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit.
    ///
    /// Suspends until capacity is available; there is no implicit timeout.
    /// Cancellation while waiting aborts the wait without consuming a
    /// permit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                // The semaphore is never closed while the gate exists.
                let permit = permit
                    .map_err(|_| Error::Internal("concurrency gate closed".into()))?;
                Ok(GatePermit { _permit: permit })
            }
        }
    }
}
