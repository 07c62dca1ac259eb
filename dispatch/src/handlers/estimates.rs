//! Pre-booking handlers: time and price estimates, product listing.

use super::json_body;
use crate::providers::{LockService, RideQueue, StatusCache, TripStore};
use crate::service::RideService;
use crate::state::{Estimate, LatLongPayload, ProductList};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use rideshare_web::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider plus one or two locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationBody {
    /// Provider identifier.
    pub provider: Option<String>,
    /// Pickup location.
    pub start_lat_long: Option<LatLongPayload>,
    /// Drop-off location; only price estimates read it.
    pub end_lat_long: Option<LatLongPayload>,
}

/// `POST /api/ride/estimates/time`
pub async fn time_estimate<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<Estimate>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;

    let estimate = service
        .time_estimate(body.provider.as_deref(), body.start_lat_long.as_ref())
        .await?;
    Ok(Json(estimate))
}

/// `POST /api/ride/estimates/price`
pub async fn price_estimate<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<Estimate>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;

    let estimate = service
        .price_estimate(
            body.provider.as_deref(),
            body.start_lat_long.as_ref(),
            body.end_lat_long.as_ref(),
        )
        .await?;
    Ok(Json(estimate))
}

/// `POST /api/ride/products`
pub async fn products<S, C, Q, L>(
    State(service): State<Arc<RideService<S, C, Q, L>>>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<ProductList>, AppError>
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    let body = json_body(body)?;

    let products = service
        .products(body.provider.as_deref(), body.start_lat_long.as_ref())
        .await?;
    Ok(Json(products))
}
