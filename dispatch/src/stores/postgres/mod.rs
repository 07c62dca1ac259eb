//! PostgreSQL storage implementations.
//!
//! Durable trip records for deployments that keep the canonical state
//! outside Redis.

pub mod trip;

// Re-exports
pub use trip::PostgresTripStore;
