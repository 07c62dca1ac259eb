//! HTTP request handlers shared across surfaces.

pub mod health;

// Re-export common handler utilities
pub use health::{health_check, health_router, readiness_check, ReadinessProbe};
