//! Ride lifecycle handlers: create, status, details, cancel.

use super::json_body;
use crate::providers::{LockService, RideQueue, StatusCache, TripStore};
use crate::service::RideService;
use crate::state::{
    CreateRideOutcome, LocalRequestId, RideRequestPayload, RideStatus, StatusQuery, TripDetails,
    TripId,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rideshare_web::{AppError, IdempotencyToken, RequesterId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body naming only the provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderBody {
    /// Provider identifier.
    pub provider: Option<String>,
}

/// `200` body of an inline dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedResponse {
    /// Provider trip identifier.
    pub trip_id: TripId,
}

/// `202` body of a queued submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    /// Token to poll status with.
    pub local_request_id: LocalRequestId,
    /// Always `true`.
    pub pending: bool,
}

/// Status lookup response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Current status.
    pub status: RideStatus,
    /// Provider trip id, once assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
}

/// Cancellation response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelResponse {
    /// `Trip canceled` or `Trip was already canceled`.
    pub message: String,
}

/// Submit a ride request.
///
/// # Endpoint
///
/// ```text
/// POST /api/ride
/// X-Requester-ID: rider-42        (optional, defaults to client IP)
/// Idempotency-Key: 7f3c...         (optional)
///
/// {
///   "ridePriority": "EMERGENCY",
///   "provider": "UBER",
///   "startLatLong": {"latitude": "37.77", "longitude": "-122.41"},
///   "endLatLong": {"latitude": "37.80", "longitude": "-122.27"},
///   "productId": "a1111c8c-c720-46c3-8534-2fcdd730040d"
/// }
/// ```
///
/// # Response
///
/// - `200 {"tripId": "..."}` when dispatched inline (EMERGENCY)
/// - `202 {"localRequestId": "...", "pending": true}` when queued (NORMAL)
/// - `409` when the same submission is already in flight
pub async fn create_ride<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    requester: RequesterId,
    token: IdempotencyToken,
    body: Result<Json<RideRequestPayload>, JsonRejection>,
) -> Result<Response, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let payload = json_body(body)?;

    let outcome = service
        .create_ride(&requester.0, &payload, token.0.as_deref())
        .await?;

    Ok(match outcome {
        CreateRideOutcome::Dispatched { trip_id } => {
            (StatusCode::OK, Json(DispatchedResponse { trip_id })).into_response()
        }
        CreateRideOutcome::Queued { local_request_id } => (
            StatusCode::ACCEPTED,
            Json(QueuedResponse {
                local_request_id,
                pending: true,
            }),
        )
            .into_response(),
    })
}

/// Status of a trip named in the path.
///
/// ```text
/// POST /api/ride/:tripId/status
/// {"provider": "UBER"}
/// ```
pub async fn trip_status<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    Path(trip_id): Path<String>,
    body: Result<Json<ProviderBody>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;
    let query = StatusQuery {
        provider: body.provider,
        trip_id: Some(trip_id),
        local_request_id: None,
    };

    let resolved = service.ride_status(&query).await?;
    Ok(Json(StatusResponse {
        status: resolved.status,
        trip_id: resolved.trip_id,
    }))
}

/// Status by trip id and/or local request id.
///
/// ```text
/// POST /api/ride/status
/// {"localRequestId": "4f1c..."}
/// ```
///
/// The provider may be omitted when the trip is already known.
pub async fn ride_status<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    body: Result<Json<StatusQuery>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let query = json_body(body)?;

    let resolved = service.ride_status(&query).await?;
    Ok(Json(StatusResponse {
        status: resolved.status,
        trip_id: resolved.trip_id,
    }))
}

/// Driver, vehicle and ETA.
///
/// ```text
/// POST /api/ride/:tripId/details
/// {"provider": "UBER"}
/// ```
pub async fn trip_details<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    Path(trip_id): Path<String>,
    body: Result<Json<ProviderBody>, JsonRejection>,
) -> Result<Json<TripDetails>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;

    let details = service
        .trip_details(body.provider.as_deref(), Some(&trip_id))
        .await?;
    Ok(Json(details))
}

/// Cancel a trip.
///
/// ```text
/// DELETE /api/ride/:tripId
/// {"provider": "UBER"}
/// ```
///
/// # Response
///
/// - `200 {"message": "Trip canceled"}`
/// - `200 {"message": "Trip was already canceled"}`
/// - `409` when the trip is too far along to cancel
pub async fn cancel_ride<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    Path(trip_id): Path<String>,
    body: Result<Json<ProviderBody>, JsonRejection>,
) -> Result<Json<CancelResponse>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;

    let outcome = service
        .cancel_ride(body.provider.as_deref(), Some(&trip_id))
        .await?;
    Ok(Json(CancelResponse {
        message: outcome.message().to_string(),
    }))
}
