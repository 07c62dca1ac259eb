//! Error types for ride dispatch operations.
//!
//! Three layers:
//!
//! - [`ValidationError`]: why an inbound request was rejected. Logged, never
//!   shown to clients.
//! - [`ProviderError`]: a failed provider network call, carrying the status
//!   code and message the provider reported.
//! - [`RideError`]: the operation-boundary taxonomy every public operation
//!   resolves to.

use crate::state::{RideStatus, TripId};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ride operations.
pub type Result<T> = std::result::Result<T, RideError>;

/// Reason an inbound request failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Priority missing or not a recognised value.
    #[error("Invalid ride priority")]
    InvalidPriority,

    /// Payload names a different provider than the adapter handling it.
    #[error("Incompatible ride provider: expected {expected}, got {actual}")]
    ProviderMismatch {
        /// Adapter identity
        expected: String,
        /// Provider named in the payload
        actual: String,
    },

    /// No provider named and none could be inferred from a stored trip.
    #[error("Provider required")]
    MissingProvider,

    /// Start location missing a component.
    #[error("Invalid start location")]
    InvalidStartLocation,

    /// End location missing a component.
    #[error("Invalid end location")]
    InvalidEndLocation,

    /// Product identifier empty or whitespace.
    #[error("Invalid product ID")]
    InvalidProductId,

    /// Upfront fare requested without a fare identifier.
    #[error("Fare ID required when upfront fare enabled")]
    FareIdRequired,

    /// Trip identifier empty or whitespace.
    #[error("Invalid trip ID")]
    InvalidTripId,

    /// Local request identifier is not a valid token.
    #[error("Invalid local request ID")]
    InvalidLocalRequestId,

    /// Neither a trip identifier nor a local request identifier was given.
    #[error("Trip ID or local request ID required")]
    MissingTripReference,

    /// Request body is not the expected JSON shape.
    #[error("Malformed request body")]
    MalformedBody,
}

/// Failure of a provider network call.
///
/// Adapters surface these verbatim; they never retry. Use
/// [`ProviderError::is_retryable`] to decide whether a redelivery makes sense.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection-level failure (DNS, TLS, reset).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Call exceeded the caller-supplied timeout.
    #[error("Provider call timed out after {after:?}")]
    Timeout {
        /// Timeout that elapsed
        after: Duration,
    },

    /// Provider answered with a body we could not decode.
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Provider rate limit hit.
    #[error("Rate limited by provider")]
    RateLimited,

    /// Provider rejected our credentials.
    #[error("Unauthorized - provider rejected credentials")]
    Unauthorized,

    /// Provider returned a non-success status.
    #[error("Provider error (status {status}): {message}")]
    Api {
        /// HTTP status code reported by the provider
        status: u16,
        /// Error message from the provider
        message: String,
    },
}

impl ProviderError {
    /// Status code to report for this failure.
    ///
    /// Provider-reported codes pass through; transport failures map onto the
    /// gateway class.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rideshare_dispatch::ProviderError;
    /// let err = ProviderError::Api { status: 404, message: "Not found".into() };
    /// assert_eq!(err.status_code(), 404);
    /// assert_eq!(ProviderError::RateLimited.status_code(), 429);
    /// ```
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RequestFailed(_) | Self::ResponseParseFailed(_) => 502,
            Self::Timeout { .. } => 504,
            Self::RateLimited => 429,
            Self::Unauthorized => 401,
            Self::Api { status, .. } => *status,
        }
    }

    /// Returns `true` if the same call may succeed when attempted again.
    ///
    /// Timeouts, connection failures, 429 and 5xx are retryable. Everything
    /// else, including undecodable responses, is terminal.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rideshare_dispatch::ProviderError;
    /// assert!(ProviderError::RateLimited.is_retryable());
    /// assert!(!ProviderError::Unauthorized.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout { .. } | Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            Self::ResponseParseFailed(_) | Self::Unauthorized => false,
        }
    }
}

/// Operation-boundary error taxonomy.
///
/// Every failure a client sees is one of these, so it can decide whether to
/// resubmit, poll, or abort.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RideError {
    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or incomplete input. The reason stays internal.
    #[error("Could not validate input!")]
    Validation(#[from] ValidationError),

    /// No adapter registered for the provider identifier.
    #[error("Unknown rideshare provider: {provider}")]
    UnknownProvider {
        /// Identifier that failed to resolve
        provider: String,
    },

    /// Another submission with the same idempotency key holds the lease.
    #[error("A request with this idempotency key is already in flight")]
    DuplicateInFlight {
        /// Contended idempotency key
        key: String,
    },

    /// No trip record matches the reference.
    #[error("Trip not found: {reference}")]
    TripNotFound {
        /// Trip or local request identifier that was looked up
        reference: String,
    },

    /// Trip is in a state where the operation is not permitted.
    #[error("Trip {trip_id} cannot be canceled while {status}")]
    StaleState {
        /// Trip identifier
        trip_id: TripId,
        /// Status observed before acting
        status: RideStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Provider Errors
    // ═══════════════════════════════════════════════════════════

    /// Provider call failed; propagated verbatim.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Durable store operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Fast cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Work queue operation failed.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Lock service operation failed.
    #[error("Lock service error: {0}")]
    LockError(String),

    /// Encoding or decoding a stored value failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RideError {
    /// Returns `true` if the client caused this error and resubmitting the
    /// same input will fail the same way.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rideshare_dispatch::{RideError, ValidationError};
    /// assert!(RideError::from(ValidationError::InvalidPriority).is_user_error());
    /// assert!(!RideError::InternalError("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnknownProvider { .. } | Self::TripNotFound { .. }
        )
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownProvider { .. } => "UNKNOWN_PROVIDER",
            Self::DuplicateInFlight { .. } => "DUPLICATE_IN_FLIGHT",
            Self::TripNotFound { .. } => "TRIP_NOT_FOUND",
            Self::StaleState { .. } => "TRIP_NOT_CANCELABLE",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::DatabaseError(_)
            | Self::CacheError(_)
            | Self::QueueError(_)
            | Self::LockError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_hides_reason() {
        let err = RideError::from(ValidationError::FareIdRequired);
        assert_eq!(err.to_string(), "Could not validate input!");

        let err = RideError::from(ValidationError::ProviderMismatch {
            expected: "UBER".to_string(),
            actual: "LYFT".to_string(),
        });
        assert_eq!(err.to_string(), "Could not validate input!");
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let err = RideError::from(ProviderError::Api {
            status: 409,
            message: "Conflict".to_string(),
        });
        assert_eq!(err.to_string(), "Provider error (status 409): Conflict");
        assert_eq!(err.code(), "PROVIDER_ERROR");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Timeout { after: Duration::from_secs(1) }.is_retryable());
        assert!(ProviderError::RequestFailed("reset".into()).is_retryable());
        assert!(ProviderError::Api { status: 503, message: String::new() }.is_retryable());
        assert!(!ProviderError::Api { status: 422, message: String::new() }.is_retryable());
        assert!(!ProviderError::ResponseParseFailed("eof".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ProviderError::Timeout { after: Duration::from_secs(1) }.status_code(), 504);
        assert_eq!(ProviderError::RequestFailed("x".into()).status_code(), 502);
        assert_eq!(ProviderError::Unauthorized.status_code(), 401);
    }

    #[test]
    fn test_error_codes_are_distinct_per_client_decision() {
        let duplicate = RideError::DuplicateInFlight { key: "k".into() };
        let unknown = RideError::UnknownProvider { provider: "LYFT".into() };
        let invalid = RideError::from(ValidationError::InvalidPriority);

        assert_ne!(duplicate.code(), invalid.code());
        assert_ne!(unknown.code(), invalid.code());
        assert!(!duplicate.is_user_error());
    }
}
