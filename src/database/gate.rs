//! Bounded concurrency gate for database operations.

use crate::error::{DatabaseError, DbResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Counting semaphore limiting in-flight database operations.
///
/// Permits are RAII guards: dropping a [`GatePermit`] (including dropping the
/// future that holds it) returns the slot.
#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Option<Duration>,
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout: None,
        }
    }

    /// Bounds the wait for a permit. `None` waits indefinitely.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::PermitTimeout`] when an acquire timeout is
    /// configured and elapses first.
    pub async fn acquire(&self) -> DbResult<GatePermit> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();

        let permit = match self.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                warn!(
                    "No execution slot freed within {}ms ({} in use)",
                    limit.as_millis(),
                    self.in_use()
                );
                DatabaseError::PermitTimeout(limit.as_millis() as u64)
            })?,
            None => acquire.await,
        }
        // The semaphore is never closed.
        .map_err(|_| DatabaseError::QueryFailed("concurrency gate closed".into()))?;

        debug!("Gate permit acquired: {} of {} available", self.available_permits(), self.capacity);
        Ok(GatePermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available_permits())
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }
}

/// RAII guard that releases the gate slot on drop.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
