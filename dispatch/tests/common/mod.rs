//! Shared wiring for the integration tests.

#![allow(dead_code)]

use rideshare_dispatch::mocks::{
    MockClock, MockLockService, MockRideProvider, MockRideQueue, MockStatusCache, MockTripStore,
};
use rideshare_dispatch::state::{LatLongPayload, RideRequestPayload};
use rideshare_dispatch::{
    Clock, CreationWorker, DispatchConfig, ProviderRegistry, RideEnvironment, RideService,
    WorkerConfig,
};
use std::sync::Arc;
use std::time::Duration;

/// Service type every test drives.
pub type TestService = RideService<MockTripStore, MockStatusCache, MockRideQueue, MockLockService>;

/// A ride service over mocks, with handles on every collaborator.
pub struct Harness {
    pub service: Arc<TestService>,
    pub provider: MockRideProvider,
    pub registry: Arc<ProviderRegistry>,
    pub trips: MockTripStore,
    pub cache: MockStatusCache,
    pub queue: MockRideQueue,
    pub locks: MockLockService,
    pub clock: Arc<MockClock>,
    pub config: DispatchConfig,
}

impl Harness {
    /// Harness with a default `UBER` mock provider.
    pub fn new() -> Self {
        Self::with_provider(MockRideProvider::new("UBER"))
    }

    /// Harness around `provider`.
    pub fn with_provider(provider: MockRideProvider) -> Self {
        Self::build(provider, DispatchConfig::default())
    }

    /// Harness with a custom engine configuration.
    pub fn build(provider: MockRideProvider, config: DispatchConfig) -> Self {
        let clock = Arc::new(MockClock::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let trips = MockTripStore::new();
        let cache = MockStatusCache::with_clock(Arc::clone(&dyn_clock));
        let queue = MockRideQueue::new();
        let locks = MockLockService::with_clock(Arc::clone(&dyn_clock));

        let registry = Arc::new(ProviderRegistry::new().with_provider(Arc::new(provider.clone())));
        let env = RideEnvironment::new(trips.clone(), cache.clone(), queue.clone(), locks.clone())
            .with_clock(dyn_clock);
        let service = Arc::new(RideService::new(Arc::clone(&registry), env, &config));

        Self {
            service,
            provider,
            registry,
            trips,
            cache,
            queue,
            locks,
            clock,
            config,
        }
    }

    /// Creation worker consuming this harness's queue.
    pub fn worker(&self) -> CreationWorker<MockRideQueue, MockTripStore> {
        CreationWorker::new(
            self.queue.clone(),
            self.trips.clone(),
            Arc::clone(&self.registry),
            self.clock.clone(),
            WorkerConfig::default().with_idle_backoff(Duration::from_millis(5)),
            self.config.provider_timeout,
        )
    }

    /// Move the clock past the status freshness horizon.
    pub fn expire_cache(&self) {
        self.clock.advance(self.config.status_freshness + Duration::from_secs(1));
    }
}

/// A complete, valid create-ride body.
pub fn payload(priority: &str) -> RideRequestPayload {
    RideRequestPayload {
        ride_priority: Some(priority.to_string()),
        provider: Some("UBER".to_string()),
        start_lat_long: Some(LatLongPayload::new("37.7749", "-122.4194")),
        end_lat_long: Some(LatLongPayload::new("37.8044", "-122.2712")),
        product_id: Some("a1111c8c-c720-46c3-8534-2fcdd730040d".to_string()),
        upfront_fare_enabled: None,
        fare_id: None,
    }
}
