//! Ride router composition.

use crate::handlers::{estimates, rides};
use crate::providers::{LockService, RideQueue, StatusCache, TripStore};
use crate::service::RideService;
use axum::{
    routing::{delete, post},
    Router,
};
use std::sync::Arc;

/// Create the ride router with every ride endpoint.
///
/// # Routes
///
/// ## Lifecycle
/// - `POST /api/ride` - Submit a ride request
/// - `POST /api/ride/status` - Status by trip id or local request id
/// - `POST /api/ride/:trip_id/status` - Status of a trip
/// - `POST /api/ride/:trip_id/details` - Driver, vehicle and ETA
/// - `DELETE /api/ride/:trip_id` - Cancel a trip
///
/// ## Pre-booking
/// - `POST /api/ride/estimates/time` - Pickup time estimates
/// - `POST /api/ride/estimates/price` - Fare estimates
/// - `POST /api/ride/products` - Products at a location
///
/// # Example
///
/// ```rust,ignore
/// let service = Arc::new(RideService::new(registry, env, &DispatchConfig::default()));
///
/// let app = ride_router(service)
///     .merge(health_router(probe))
///     .layer(correlation_id_layer());
/// ```
pub fn ride_router<S, C, Q, L>(service: Arc<RideService<S, C, Q, L>>) -> Router
where
    S: TripStore + Clone + 'static,
    C: StatusCache + Clone + 'static,
    Q: RideQueue + Clone + 'static,
    L: LockService + Clone + 'static,
{
    Router::new()
        // Lifecycle routes
        .route("/api/ride", post(rides::create_ride::<S, C, Q, L>))
        .route("/api/ride/status", post(rides::ride_status::<S, C, Q, L>))
        .route("/api/ride/:trip_id/status", post(rides::trip_status::<S, C, Q, L>))
        .route("/api/ride/:trip_id/details", post(rides::trip_details::<S, C, Q, L>))
        .route("/api/ride/:trip_id", delete(rides::cancel_ride::<S, C, Q, L>))

        // Pre-booking routes
        .route("/api/ride/estimates/time", post(estimates::time_estimate::<S, C, Q, L>))
        .route("/api/ride/estimates/price", post(estimates::price_estimate::<S, C, Q, L>))
        .route("/api/ride/products", post(estimates::products::<S, C, Q, L>))

        .with_state(service)
}
