//! Dispatch environment.
//!
//! Bundles the external collaborators the engine needs so they can be
//! injected as real services in production and mocks in tests.

use crate::providers::{LockService, RideQueue, StatusCache, TripStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Ride dispatch environment.
///
/// # Type Parameters
///
/// - `S`: Trip store (durable)
/// - `C`: Status cache
/// - `Q`: Ride-creation queue
/// - `L`: Lock service
#[derive(Clone)]
pub struct RideEnvironment<S, C, Q, L>
where
    S: TripStore + Clone,
    C: StatusCache + Clone,
    Q: RideQueue + Clone,
    L: LockService + Clone,
{
    /// Durable trip records.
    pub trips: S,

    /// Fast status cache.
    pub cache: C,

    /// Ride-creation work queue.
    pub queue: Q,

    /// Idempotency lock service.
    pub locks: L,

    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl<S, C, Q, L> RideEnvironment<S, C, Q, L>
where
    S: TripStore + Clone,
    C: StatusCache + Clone,
    Q: RideQueue + Clone,
    L: LockService + Clone,
{
    /// Create an environment on the wall clock.
    #[must_use]
    pub fn new(trips: S, cache: C, queue: Q, locks: L) -> Self {
        Self {
            trips,
            cache,
            queue,
            locks,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
