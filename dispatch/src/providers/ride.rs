//! Rideshare provider capability interface.
//!
//! One implementation per provider. Each network operation maps 1:1 to a
//! provider call and reports failures as [`ProviderError`] without retrying.
//! Validators are pure and shared through [`crate::validation`], so every
//! adapter applies identical rules unless it deliberately overrides them.

use crate::error::{ProviderError, ValidationError};
use crate::state::{
    Estimate, LatLong, ProductList, ProviderId, ProviderTripHandle, RideRequest,
    RideRequestPayload, RideStatus, StatusQuery, TripDetails, TripId, TripReference,
};
use crate::validation;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Ride operations offered by a provider.
///
/// # Example
///
/// ```no_run
/// use rideshare_dispatch::providers::{RideProvider, UberConfig, UberRideProvider};
/// use rideshare_dispatch::state::TripId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let uber = UberRideProvider::new(UberConfig::new("token".to_string()));
/// let status = uber.get_trip_status(&TripId::new("T123")).await?;
/// println!("{status}");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RideProvider: Send + Sync {
    /// Identity the adapter answers to.
    fn id(&self) -> &ProviderId;

    /// Request a trip.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider rejects the request or the
    /// call fails.
    async fn request_trip(&self, request: &RideRequest)
    -> Result<ProviderTripHandle, ProviderError>;

    /// Cancel a trip.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider refuses or the call fails.
    async fn cancel_trip(&self, trip_id: &TripId) -> Result<(), ProviderError>;

    /// Current status of a trip.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the lookup fails.
    async fn get_trip_status(&self, trip_id: &TripId) -> Result<RideStatus, ProviderError>;

    /// Driver, vehicle and ETA for a trip.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the lookup fails.
    async fn get_trip_details(&self, trip_id: &TripId) -> Result<TripDetails, ProviderError>;

    /// Pickup time estimates at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the lookup fails.
    async fn get_time_estimate(&self, start: &LatLong) -> Result<Estimate, ProviderError>;

    /// Fare estimates from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the lookup fails.
    async fn get_price_estimate(
        &self,
        start: &LatLong,
        end: &LatLong,
    ) -> Result<Estimate, ProviderError>;

    /// Products available at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the lookup fails.
    async fn list_products(&self, start: &LatLong) -> Result<ProductList, ProviderError>;

    /// Validate a create-ride payload against this adapter.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`].
    fn validate_create(
        &self,
        payload: &RideRequestPayload,
    ) -> Result<RideRequest, ValidationError> {
        validation::validate_create(self.id(), payload)
    }

    /// Validate a cancel request.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTripId`] for a blank trip id.
    fn validate_cancel(&self, trip_id: Option<&str>) -> Result<TripId, ValidationError> {
        validation::validate_trip_id(trip_id)
    }

    /// Validate a status query.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if neither reference is usable.
    fn validate_status(&self, query: &StatusQuery) -> Result<TripReference, ValidationError> {
        validation::validate_status_query(query)
    }

    /// Validate a details request.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTripId`] for a blank trip id.
    fn validate_details(&self, trip_id: Option<&str>) -> Result<TripId, ValidationError> {
        validation::validate_trip_id(trip_id)
    }
}

/// Bound a provider call by `after`. An elapsed call is a failure, never an
/// assumed success.
///
/// # Errors
///
/// Returns [`ProviderError::Timeout`] if the call does not finish in time,
/// otherwise the call's own result.
pub async fn with_timeout<T, F>(after: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(after, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout { after }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_elapsed_is_failure() {
        let result: Result<(), ProviderError> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(ProviderError::Timeout { after: Duration::from_millis(10) })
        );
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(ProviderError::RateLimited)
        })
        .await;
        assert_eq!(result, Err(ProviderError::RateLimited));
    }
}
