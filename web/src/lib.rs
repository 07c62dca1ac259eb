//! Axum integration for the rideshare mediation service.
//!
//! The dispatch engine knows nothing about HTTP. This crate holds the pieces
//! every HTTP surface in front of it shares:
//!
//! - [`AppError`]: JSON error body `{code, message}` with an HTTP status
//! - Extractors: [`CorrelationId`], [`ClientIp`], [`RequesterId`],
//!   [`IdempotencyToken`]
//! - [`correlation_id_layer`]: per-request tracing span and echoed
//!   `X-Correlation-ID` header
//! - Liveness and readiness handlers
//!
//! # Request Flow
//!
//! 1. **Correlation layer** opens the `http_request` span
//! 2. **Extractors** pull requester identity and idempotency token
//! 3. **Handler** calls the ride service
//! 4. **Errors** become `AppError` and render as JSON
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use rideshare_web::{correlation_id_layer, handlers::health_check};
//!
//! let app = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(correlation_id_layer());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId, IdempotencyToken, RequesterId};
pub use handlers::{health_router, ReadinessProbe};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
