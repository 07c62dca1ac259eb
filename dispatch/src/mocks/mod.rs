//! Mock collaborator implementations for testing.
//!
//! In-memory, deterministic implementations of every collaborator trait,
//! plus a manually advanced clock so freshness and lease expiry can be tested
//! without sleeping.

pub mod clock;
pub mod lock;
pub mod provider;
pub mod queue;
pub mod status_cache;
pub mod trip_store;

pub use clock::MockClock;
pub use lock::MockLockService;
pub use provider::MockRideProvider;
pub use queue::MockRideQueue;
pub use status_cache::MockStatusCache;
pub use trip_store::MockTripStore;
