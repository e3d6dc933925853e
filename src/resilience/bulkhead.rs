//! Bulkhead: bounded concurrency per dependency.
//!
//! # Responsibilities
//! - Cap simultaneous in-flight calls to one upstream
//! - Make waiters give up when their context is cancelled or expires
//!
//! # Design Decisions
//! - Backed by a `tokio::sync::Semaphore`; slots are owned permits
//! - A slot is returned exactly once, when the permit is released or dropped
//! - No fairness guarantee beyond what the semaphore provides

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::resilience::context::{CallContext, ContextError};

/// Fixed-capacity pool of call slots.
#[derive(Debug, Clone)]
pub struct Bulkhead {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl Bulkhead {
    /// Create a bulkhead admitting at most `max_concurrency` callers.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_concurrency)),
            capacity: max_concurrency,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot.
    ///
    /// Fails with the context error, without taking a slot, if `ctx` is
    /// already done or finishes while waiting.
    pub async fn acquire(&self, ctx: &CallContext) -> Result<BulkheadPermit, ContextError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            cause = ctx.done() => Err(cause),
            permit = self.slots.clone().acquire_owned() => {
                // The semaphore is never closed, so this only fails if that changes.
                let permit = permit.map_err(|_| ContextError::Cancelled)?;
                Ok(BulkheadPermit { _permit: permit })
            }
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<BulkheadPermit> {
        self.slots
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| BulkheadPermit { _permit: permit })
    }
}

/// One occupied slot. Returned to the bulkhead on `release` or drop.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

impl BulkheadPermit {
    /// Return the slot now.
    pub fn release(self) {
        drop(self);
    }
}
