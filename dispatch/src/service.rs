//! Ride service: the operation boundary.
//!
//! Classifies each inbound operation, resolves the provider adapter, runs the
//! adapter's validator and hands off to the dispatch router, status resolver
//! or cancellation machine. Every failure leaves here as a [`RideError`].

use crate::cancellation::CancellationMachine;
use crate::config::DispatchConfig;
use crate::coordinator::LockCoordinator;
use crate::dispatcher::DispatchRouter;
use crate::environment::RideEnvironment;
use crate::error::{RideError, Result, ValidationError};
use crate::providers::{LockService, RideProvider, RideQueue, StatusCache, TripStore, with_timeout};
use crate::registry::ProviderRegistry;
use crate::state::{
    CancelOutcome, CreateRideOutcome, Estimate, IdempotencyKey, LatLongPayload, ProductList,
    ResolvedStatus, RideRequestPayload, StatusQuery, TripDetails, TripReference,
};
use crate::status::StatusResolver;
use crate::validation::require_location;
use std::sync::Arc;
use std::time::Duration;

/// Ride operations over a set of registered providers.
pub struct RideService<S, C, Q, L> {
    registry: Arc<ProviderRegistry>,
    trips: S,
    dispatcher: DispatchRouter<S, Q, L>,
    resolver: StatusResolver<S, C>,
    cancellation: CancellationMachine<S, C>,
    provider_timeout: Duration,
}

impl<S, C, Q, L> RideService<S, C, Q, L>
where
    S: TripStore + Clone,
    C: StatusCache + Clone,
    Q: RideQueue + Clone,
    L: LockService + Clone,
{
    /// Wire the engine components over `env`.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        env: RideEnvironment<S, C, Q, L>,
        config: &DispatchConfig,
    ) -> Self {
        let resolver = StatusResolver::new(
            env.trips.clone(),
            env.cache,
            Arc::clone(&env.clock),
            config.status_freshness,
            config.provider_timeout,
        );
        let dispatcher = DispatchRouter::new(
            env.trips.clone(),
            env.queue,
            LockCoordinator::new(env.locks, config.lock_ttl),
            env.clock,
            config.provider_timeout,
        );

        Self {
            registry,
            trips: env.trips,
            dispatcher,
            cancellation: CancellationMachine::new(resolver.clone(), config.provider_timeout),
            resolver,
            provider_timeout: config.provider_timeout,
        }
    }

    /// Registered providers.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Submit a ride request.
    ///
    /// `client_key`, when given, replaces the idempotency key derived from
    /// the request signature.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider`, `DuplicateInFlight`, `Provider`, or
    /// an infrastructure error.
    pub async fn create_ride(
        &self,
        requester: &str,
        payload: &RideRequestPayload,
        client_key: Option<&str>,
    ) -> Result<CreateRideOutcome> {
        let provider = self.provider(payload.provider.as_deref())?;
        let request = provider
            .validate_create(payload)
            .map_err(|e| rejected("create", e))?;

        let key = client_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map_or_else(
                || IdempotencyKey::derive(requester, &request),
                |k| IdempotencyKey::from_client(requester, k),
            );

        self.dispatcher
            .dispatch(provider.as_ref(), requester, &key, request)
            .await
    }

    /// Cancel a trip.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider`, `StaleState`, `Provider`, or an
    /// infrastructure error.
    pub async fn cancel_ride(
        &self,
        provider: Option<&str>,
        trip_id: Option<&str>,
    ) -> Result<CancelOutcome> {
        let provider = self.provider(provider)?;
        let trip_id = provider
            .validate_cancel(trip_id)
            .map_err(|e| rejected("cancel", e))?;

        self.cancellation.cancel(provider.as_ref(), &trip_id).await
    }

    /// Resolve the status of a trip or a queued request.
    ///
    /// The provider may be omitted when a stored record names it.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider`, `TripNotFound`, `Provider`, or an
    /// infrastructure error.
    pub async fn ride_status(&self, query: &StatusQuery) -> Result<ResolvedStatus> {
        let reference =
            crate::validation::validate_status_query(query).map_err(|e| rejected("status", e))?;

        let provider = match non_blank(query.provider.as_deref()) {
            Some(name) => self.registry.resolve(name)?,
            None => {
                let name = self.stored_provider(&reference).await?;
                self.registry.resolve(&name)?
            }
        };

        // Adapter-specific rules still apply on top of the shared parse.
        let reference = provider
            .validate_status(query)
            .map_err(|e| rejected("status", e))?;

        self.resolver.resolve(provider.as_ref(), &reference).await
    }

    /// Driver, vehicle and ETA for a trip.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider` or `Provider`.
    pub async fn trip_details(
        &self,
        provider: Option<&str>,
        trip_id: Option<&str>,
    ) -> Result<TripDetails> {
        let provider = self.provider(provider)?;
        let trip_id = provider
            .validate_details(trip_id)
            .map_err(|e| rejected("details", e))?;

        Ok(with_timeout(self.provider_timeout, provider.get_trip_details(&trip_id)).await?)
    }

    /// Pickup time estimates at `start`.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider` or `Provider`.
    pub async fn time_estimate(
        &self,
        provider: Option<&str>,
        start: Option<&LatLongPayload>,
    ) -> Result<Estimate> {
        let provider = self.provider(provider)?;
        let start = require_location(start, ValidationError::InvalidStartLocation)
            .map_err(|e| rejected("time_estimate", e))?;

        Ok(with_timeout(self.provider_timeout, provider.get_time_estimate(&start)).await?)
    }

    /// Fare estimates between two points.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider` or `Provider`.
    pub async fn price_estimate(
        &self,
        provider: Option<&str>,
        start: Option<&LatLongPayload>,
        end: Option<&LatLongPayload>,
    ) -> Result<Estimate> {
        let provider = self.provider(provider)?;
        let start = require_location(start, ValidationError::InvalidStartLocation)
            .map_err(|e| rejected("price_estimate", e))?;
        let end = require_location(end, ValidationError::InvalidEndLocation)
            .map_err(|e| rejected("price_estimate", e))?;

        Ok(with_timeout(self.provider_timeout, provider.get_price_estimate(&start, &end)).await?)
    }

    /// Products available at `start`.
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownProvider` or `Provider`.
    pub async fn products(
        &self,
        provider: Option<&str>,
        start: Option<&LatLongPayload>,
    ) -> Result<ProductList> {
        let provider = self.provider(provider)?;
        let start = require_location(start, ValidationError::InvalidStartLocation)
            .map_err(|e| rejected("products", e))?;

        Ok(with_timeout(self.provider_timeout, provider.list_products(&start)).await?)
    }

    fn provider(&self, name: Option<&str>) -> Result<Arc<dyn RideProvider>> {
        let name = non_blank(name).ok_or_else(|| rejected("resolve", ValidationError::MissingProvider))?;
        self.registry.resolve(name)
    }

    async fn stored_provider(&self, reference: &TripReference) -> Result<String> {
        let record = match reference {
            TripReference::Trip(trip_id) => self.trips.get_by_trip_id(trip_id).await?,
            TripReference::Local(local) => self.trips.get_by_local_request_id(local).await?,
        };
        record
            .map(|r| r.provider.to_string())
            .ok_or_else(|| rejected("status", ValidationError::MissingProvider))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Log the specific reason and convert to the generic client-facing error.
fn rejected(operation: &'static str, reason: ValidationError) -> RideError {
    tracing::warn!(operation, reason = %reason, "Could not validate input");
    RideError::Validation(reason)
}
