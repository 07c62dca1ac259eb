//! # Rideshare Dispatch
//!
//! A mediation engine between clients and third-party rideshare providers:
//! it routes ride requests by priority, answers status queries through a
//! freshness-bounded cache, and drives cancellation as a small state machine.
//!
//! ## Features
//!
//! - **Priority routing**: EMERGENCY calls the provider inline, NORMAL is
//!   queued for a background worker and answered with a local request id
//! - **Idempotent submission**: one in-flight dispatch per requester and
//!   request signature, guarded by an expiring lease
//! - **Read-through status**: cache, then provider, written back durably
//! - **Provider agnostic**: adapters register at startup behind one trait
//!
//! ## Architecture
//!
//! ```text
//! HTTP ─▶ RideService ─▶ ProviderRegistry ─▶ dyn RideProvider
//!              │
//!              ├─▶ DispatchRouter ──▶ LockCoordinator ─▶ LockService
//!              │         └─────────▶ RideQueue ─▶ CreationWorker
//!              ├─▶ StatusResolver ─▶ StatusCache, TripStore
//!              └─▶ CancellationMachine
//! ```
//!
//! ## Example: Create and poll a ride
//!
//! ```rust,ignore
//! use rideshare_dispatch::*;
//!
//! let registry = Arc::new(ProviderRegistry::new().with_provider(Arc::new(uber)));
//! let service = RideService::new(registry, env, &DispatchConfig::default());
//!
//! match service.create_ride("rider-42", &payload, None).await? {
//!     CreateRideOutcome::Dispatched { trip_id } => println!("trip {trip_id}"),
//!     CreateRideOutcome::Queued { local_request_id } => {
//!         let query = StatusQuery {
//!             local_request_id: Some(local_request_id.to_string()),
//!             ..StatusQuery::default()
//!         };
//!         let status = service.ride_status(&query).await?;
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod cancellation;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod providers;
pub mod registry;
pub mod service;
pub mod state;
pub mod status;
pub mod stores;
pub mod validation;
pub mod worker;

// HTTP surface
#[cfg(feature = "axum")]
pub mod handlers;
#[cfg(feature = "axum")]
pub mod router;

// Mock implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::{DispatchConfig, WorkerConfig};
pub use environment::{Clock, RideEnvironment, SystemClock};
pub use error::{ProviderError, RideError, Result, ValidationError};
pub use registry::ProviderRegistry;
pub use service::RideService;
pub use state::{
    CancelOutcome, CreateRideOutcome, LocalRequestId, ProviderId, RideRequestPayload, RideStatus,
    StatusQuery, TripId, TripRecord,
};
pub use worker::{CreationWorker, JobOutcome};

#[cfg(feature = "axum")]
pub use router::ride_router;
