//! Weighted admission control for thumbnail work.
//!
//! The pool is sized in work units rather than request slots: a request
//! acquires as many units as its estimated [`Weight`], so twenty small
//! images can be resampled side by side while a single 20-unit panorama
//! occupies the whole pool.
//!
//! [`Admission`] is the seam; [`WeightedPool`] is the production
//! implementation backed by a tokio [`Semaphore`] used as a plain counter.
//! Callers normally go through [`admit`], which returns an
//! [`AdmissionGuard`] that gives the units back when dropped, so every exit
//! path after a successful acquire releases exactly once.
//!
//! Waiters are not served in strict arrival order across different weights;
//! the only promise is that a waiter whose weight fits the free capacity
//! eventually proceeds.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::cost::{MAX_WEIGHT, Weight};
use crate::lifecycle::Liveness;

/// Default pool capacity. Equal to [`MAX_WEIGHT`] so that every single
/// request is admissible on an idle pool.
pub const DEFAULT_CAPACITY: u32 = MAX_WEIGHT;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The request was abandoned while waiting. Nothing was taken.
    #[error("cancelled while waiting for admission")]
    Cancelled,

    /// The weight can never fit in this pool.
    #[error("weight {weight} exceeds pool capacity {capacity}")]
    Oversized { weight: u32, capacity: u32 },

    #[error("admission pool closed")]
    Closed,
}

/// A counting pool of work units.
///
/// `release` must be called exactly once for each `acquire` that returned
/// `Ok`, and never otherwise. [`admit`] enforces this with a guard.
#[async_trait]
pub trait Admission: Send + Sync + fmt::Debug {
    /// Wait until `weight` units are free and take them, or give up with
    /// [`AdmissionError::Cancelled`] when `liveness` is cancelled first.
    async fn acquire(&self, weight: Weight, liveness: &Liveness) -> Result<(), AdmissionError>;

    /// Return `weight` units to the pool.
    fn release(&self, weight: Weight);

    /// Total units the pool was created with.
    fn capacity(&self) -> u32;

    /// Units currently held by admitted requests.
    fn in_use(&self) -> u32;
}

/// Semaphore-backed [`Admission`] pool.
pub struct WeightedPool {
    units: Semaphore,
    capacity: u32,
}

impl WeightedPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            units: Semaphore::new(capacity as usize),
            capacity,
        }
    }

    /// Units free right now.
    pub fn available(&self) -> u32 {
        self.units.available_permits() as u32
    }
}

impl Default for WeightedPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for WeightedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

#[async_trait]
impl Admission for WeightedPool {
    async fn acquire(&self, weight: Weight, liveness: &Liveness) -> Result<(), AdmissionError> {
        let units = weight.units();
        if units > self.capacity {
            return Err(AdmissionError::Oversized {
                weight: units,
                capacity: self.capacity,
            });
        }

        // Dropping a pending `acquire_many` hands back any partially
        // assigned permits, so a cancelled waiter leaves the count intact.
        tokio::select! {
            biased;
            _ = liveness.cancelled() => Err(AdmissionError::Cancelled),
            permit = self.units.acquire_many(units) => {
                permit.map_err(|_| AdmissionError::Closed)?.forget();
                Ok(())
            }
        }
    }

    fn release(&self, weight: Weight) {
        self.units.add_permits(weight.units() as usize);
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn in_use(&self) -> u32 {
        self.capacity.saturating_sub(self.available())
    }
}

/// Units held by one admitted request. Released on drop.
#[must_use = "dropping the guard releases the admission immediately"]
pub struct AdmissionGuard {
    pool: Arc<dyn Admission>,
    weight: Weight,
}

impl AdmissionGuard {
    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Give the units back now.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGuard")
            .field("weight", &self.weight)
            .finish()
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.pool.release(self.weight);
        tracing::trace!(weight = self.weight.units(), "admission released");
    }
}

/// Acquire `weight` units from `pool`, wrapped in a releasing guard.
pub async fn admit(
    pool: &Arc<dyn Admission>,
    weight: Weight,
    liveness: &Liveness,
) -> Result<AdmissionGuard, AdmissionError> {
    pool.acquire(weight, liveness).await?;
    tracing::trace!(
        weight = weight.units(),
        in_use = pool.in_use(),
        "admission acquired"
    );
    Ok(AdmissionGuard {
        pool: Arc::clone(pool),
        weight,
    })
}
