//! HTTP handlers for the ride endpoints.
//!
//! Handlers extract requester identity and body, call [`RideService`] and
//! map the outcome. Every failure is converted from [`RideError`] to
//! [`AppError`] here, so the status code policy lives in one place.
//!
//! [`RideService`]: crate::service::RideService

pub mod estimates;
pub mod rides;

use crate::error::RideError;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use rideshare_web::AppError;

impl From<RideError> for AppError {
    fn from(err: RideError) -> Self {
        let code = err.code();
        match err {
            RideError::Validation(_) | RideError::UnknownProvider { .. } => {
                Self::bad_request(code, err.to_string())
            }
            RideError::DuplicateInFlight { .. } | RideError::StaleState { .. } => {
                Self::conflict(code, err.to_string())
            }
            RideError::TripNotFound { .. } => Self::not_found(code, err.to_string()),
            RideError::Provider(provider) => {
                Self::upstream(provider.status_code(), code, provider.to_string())
            }
            RideError::CacheError(_) | RideError::QueueError(_) | RideError::LockError(_) => {
                Self::unavailable("A backing service is unavailable")
                    .with_source(anyhow::Error::new(err))
            }
            RideError::DatabaseError(_)
            | RideError::SerializationError(_)
            | RideError::InternalError(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

/// Unwrap a JSON body, answering malformed bodies like any other
/// validation failure.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::warn!(reason = %rejection.body_text(), "Could not validate input");
        AppError::from(RideError::Validation(
            crate::error::ValidationError::MalformedBody,
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ValidationError};
    use crate::state::{RideStatus, TripId};
    use axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_generic_400() {
        let err = AppError::from(RideError::from(ValidationError::FareIdRequired));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.message(), "Could not validate input!");
    }

    #[test]
    fn test_conflicts_map_to_409() {
        let duplicate = AppError::from(RideError::DuplicateInFlight { key: "k".into() });
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let stale = AppError::from(RideError::StaleState {
            trip_id: TripId::new("T1"),
            status: RideStatus::DroppingOff,
        });
        assert_eq!(stale.status(), StatusCode::CONFLICT);
        assert_eq!(stale.code(), "TRIP_NOT_CANCELABLE");
    }

    #[test]
    fn test_provider_status_passes_through() {
        let err = AppError::from(RideError::from(ProviderError::Api {
            status: 422,
            message: "Invalid product".into(),
        }));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "PROVIDER_ERROR");

        let timeout = AppError::from(RideError::from(ProviderError::Timeout {
            after: std::time::Duration::from_secs(10),
        }));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_infrastructure_hides_detail() {
        let err = AppError::from(RideError::CacheError("connection refused".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message().contains("refused"));

        let err = AppError::from(RideError::DatabaseError("relation missing".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
