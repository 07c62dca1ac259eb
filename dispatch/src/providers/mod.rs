//! Dispatch providers.
//!
//! Traits for every external collaborator the engine talks to, plus the
//! provider adapters themselves.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────┐
//!   inbound op ──▶ │ ProviderRegistry     │ ──▶ dyn RideProvider (UBER, ...)
//!                  └──────────┬───────────┘
//!                             │
//!        ┌────────────────────┼─────────────────────┐
//!        ▼                    ▼                     ▼
//!  ┌───────────┐      ┌──────────────┐      ┌──────────────┐
//!  │LockService│      │ TripStore    │      │ RideQueue    │
//!  │(idempot.) │      │ StatusCache  │      │ JobSource    │
//!  └───────────┘      └──────────────┘      └──────────────┘
//! ```
//!
//! `RideProvider` is object safe because the registry resolves adapters at
//! runtime. The storage traits are generic parameters of the engine and
//! return `impl Future` directly.

pub mod lock;
pub mod queue;
pub mod ride;
pub mod status_cache;
pub mod trip_store;
pub mod uber;

pub use lock::{Lease, LockService};
pub use queue::{Delivery, JobSource, RideQueue};
pub use ride::{RideProvider, with_timeout};
pub use status_cache::StatusCache;
pub use trip_store::TripStore;
pub use uber::{UberConfig, UberRideProvider};
