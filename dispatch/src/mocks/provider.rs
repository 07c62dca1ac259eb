//! Mock rideshare provider for testing.

use crate::error::ProviderError;
use crate::providers::RideProvider;
use crate::state::{
    Estimate, EstimateEntry, EstimateKind, LatLong, Product, ProductList, ProviderId,
    ProviderTripHandle, RideRequest, RideStatus, TripDetails, TripId,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Script {
    trip_id: String,
    status: RideStatus,
    request_error: Option<ProviderError>,
    status_error: Option<ProviderError>,
    cancel_error: Option<ProviderError>,
    delay: Duration,
}

#[derive(Debug, Default)]
struct Calls {
    request_trip: AtomicUsize,
    status: AtomicUsize,
    cancel: AtomicUsize,
    details: AtomicUsize,
}

/// Scripted provider adapter.
///
/// Clones share the script and call counters, so a test can keep a handle
/// after registering the adapter.
///
/// Defaults: trip id `T123`, status `PENDING`, every call succeeds.
#[derive(Debug, Clone)]
pub struct MockRideProvider {
    id: ProviderId,
    script: Arc<Mutex<Script>>,
    calls: Arc<Calls>,
}

impl MockRideProvider {
    /// Adapter answering to `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: ProviderId::new(id),
            script: Arc::new(Mutex::new(Script {
                trip_id: "T123".to_string(),
                status: RideStatus::Pending,
                request_error: None,
                status_error: None,
                cancel_error: None,
                delay: Duration::ZERO,
            })),
            calls: Arc::new(Calls::default()),
        }
    }

    fn edit(&self, f: impl FnOnce(&mut Script)) {
        if let Ok(mut script) = self.script.lock() {
            f(&mut script);
        }
    }

    fn script(&self) -> Result<Script, ProviderError> {
        self.script
            .lock()
            .map(|s| s.clone())
            .map_err(|_| ProviderError::RequestFailed("Mutex lock failed".into()))
    }

    /// Trip id returned by `request_trip`.
    #[must_use]
    pub fn with_trip_id(self, trip_id: &str) -> Self {
        self.edit(|s| s.trip_id = trip_id.to_string());
        self
    }

    /// Status reported by `get_trip_status`.
    #[must_use]
    pub fn with_status(self, status: RideStatus) -> Self {
        self.set_status(status);
        self
    }

    /// Change the reported status mid-test.
    pub fn set_status(&self, status: RideStatus) {
        self.edit(|s| s.status = status);
    }

    /// Make `request_trip` fail.
    #[must_use]
    pub fn with_request_error(self, error: ProviderError) -> Self {
        self.edit(|s| s.request_error = Some(error));
        self
    }

    /// Make `get_trip_status` fail.
    #[must_use]
    pub fn with_status_error(self, error: ProviderError) -> Self {
        self.edit(|s| s.status_error = Some(error));
        self
    }

    /// Make `cancel_trip` fail.
    #[must_use]
    pub fn with_cancel_error(self, error: ProviderError) -> Self {
        self.edit(|s| s.cancel_error = Some(error));
        self
    }

    /// Delay every network operation.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.edit(|s| s.delay = delay);
        self
    }

    /// Number of `request_trip` calls.
    #[must_use]
    pub fn request_trip_calls(&self) -> usize {
        self.calls.request_trip.load(Ordering::SeqCst)
    }

    /// Number of `get_trip_status` calls.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.calls.status.load(Ordering::SeqCst)
    }

    /// Number of `cancel_trip` calls.
    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        self.calls.cancel.load(Ordering::SeqCst)
    }

    /// Number of `get_trip_details` calls.
    #[must_use]
    pub fn details_calls(&self) -> usize {
        self.calls.details.load(Ordering::SeqCst)
    }

    async fn begin(&self, counter: &AtomicUsize) -> Result<Script, ProviderError> {
        counter.fetch_add(1, Ordering::SeqCst);
        let script = self.script()?;
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        Ok(script)
    }
}

#[async_trait]
impl RideProvider for MockRideProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn request_trip(
        &self,
        _request: &RideRequest,
    ) -> Result<ProviderTripHandle, ProviderError> {
        let script = self.begin(&self.calls.request_trip).await?;
        match script.request_error {
            Some(error) => Err(error),
            None => Ok(ProviderTripHandle {
                trip_id: TripId::new(script.trip_id),
                status: RideStatus::Pending,
            }),
        }
    }

    async fn cancel_trip(&self, _trip_id: &TripId) -> Result<(), ProviderError> {
        let script = self.begin(&self.calls.cancel).await?;
        match script.cancel_error {
            Some(error) => Err(error),
            None => {
                self.set_status(RideStatus::Canceled);
                Ok(())
            }
        }
    }

    async fn get_trip_status(&self, _trip_id: &TripId) -> Result<RideStatus, ProviderError> {
        let script = self.begin(&self.calls.status).await?;
        script.status_error.map_or(Ok(script.status), Err)
    }

    async fn get_trip_details(&self, trip_id: &TripId) -> Result<TripDetails, ProviderError> {
        let script = self.begin(&self.calls.details).await?;
        Ok(TripDetails {
            trip_id: trip_id.clone(),
            status: script.status,
            driver: None,
            vehicle: None,
            pickup_eta_minutes: Some(5),
        })
    }

    async fn get_time_estimate(&self, _start: &LatLong) -> Result<Estimate, ProviderError> {
        Ok(Estimate {
            kind: EstimateKind::Time,
            entries: vec![EstimateEntry {
                product_id: "abc".to_string(),
                display_name: "Mock".to_string(),
                duration_seconds: Some(120),
                price: None,
            }],
        })
    }

    async fn get_price_estimate(
        &self,
        _start: &LatLong,
        _end: &LatLong,
    ) -> Result<Estimate, ProviderError> {
        Ok(Estimate {
            kind: EstimateKind::Price,
            entries: Vec::new(),
        })
    }

    async fn list_products(&self, _start: &LatLong) -> Result<ProductList, ProviderError> {
        Ok(ProductList {
            products: vec![Product {
                product_id: "abc".to_string(),
                display_name: "Mock".to_string(),
                description: "Mock product".to_string(),
                capacity: 4,
            }],
        })
    }
}
