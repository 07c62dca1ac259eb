//! Status resolver.
//!
//! Reconciles the fast cache against the authoritative provider lookup:
//!
//! 1. A local request id with no provider trip id yet resolves from the
//!    durable record, without contacting the provider.
//! 2. A fresh cache entry is served as-is.
//! 3. On a miss or an expired entry, the provider is asked and the answer is
//!    written through to the durable store and then the cache before it is
//!    returned.
//! 4. A provider failure is surfaced; an expired entry is never served in
//!    its place.

use crate::constants::metrics::STATUS_CACHE;
use crate::environment::Clock;
use crate::error::{RideError, Result, ValidationError};
use crate::providers::{RideProvider, StatusCache, TripStore, with_timeout};
use crate::state::{
    ProviderId, ResolvedStatus, RideStatus, StatusSnapshot, StatusSource, TripId, TripRecord,
    TripReference,
};
use std::sync::Arc;
use std::time::Duration;

/// Resolves trip status with a read-through, write-through cache.
#[derive(Clone)]
pub struct StatusResolver<S, C> {
    trips: S,
    cache: C,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    provider_timeout: Duration,
}

impl<S, C> StatusResolver<S, C>
where
    S: TripStore,
    C: StatusCache,
{
    /// Create a resolver.
    #[must_use]
    pub fn new(
        trips: S,
        cache: C,
        clock: Arc<dyn Clock>,
        freshness: Duration,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            trips,
            cache,
            clock,
            freshness,
            provider_timeout,
        }
    }

    /// Resolve the status of `reference`.
    ///
    /// # Errors
    ///
    /// - `TripNotFound` if a local request id matches no record
    /// - `Validation` if the stored record belongs to another provider
    /// - `Provider` if the provider lookup fails or times out
    /// - `DatabaseError` if the store is unavailable
    pub async fn resolve(
        &self,
        provider: &dyn RideProvider,
        reference: &TripReference,
    ) -> Result<ResolvedStatus> {
        match reference {
            TripReference::Trip(trip_id) => self.resolve_trip(provider, trip_id).await,
            TripReference::Local(local_request_id) => {
                let record = self
                    .trips
                    .get_by_local_request_id(local_request_id)
                    .await?
                    .ok_or_else(|| RideError::TripNotFound {
                        reference: local_request_id.to_string(),
                    })?;

                if &record.provider != provider.id() {
                    return Err(ValidationError::ProviderMismatch {
                        expected: provider.id().to_string(),
                        actual: record.provider.to_string(),
                    }
                    .into());
                }

                match record.trip_id {
                    Some(trip_id) => self.resolve_trip(provider, &trip_id).await,
                    None => {
                        metrics::counter!(STATUS_CACHE, "outcome" => "record").increment(1);
                        Ok(ResolvedStatus {
                            status: record.status,
                            trip_id: None,
                            source: StatusSource::Record,
                        })
                    }
                }
            }
        }
    }

    /// Resolve the status of a provider trip id.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the lookup fails, or `DatabaseError` if the
    /// write-through could not reach the durable store.
    pub async fn resolve_trip(
        &self,
        provider: &dyn RideProvider,
        trip_id: &TripId,
    ) -> Result<ResolvedStatus> {
        let now = self.clock.now();
        match self.cache.get(trip_id).await {
            Ok(Some(snapshot)) if snapshot.is_fresh(now, self.freshness) => {
                metrics::counter!(STATUS_CACHE, "outcome" => "hit").increment(1);
                tracing::debug!(trip_id = %trip_id, status = %snapshot.status, "Status served from cache");
                return Ok(ResolvedStatus {
                    status: snapshot.status,
                    trip_id: Some(trip_id.clone()),
                    source: StatusSource::Cache,
                });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(trip_id = %trip_id, error = %e, "Status cache read failed, treating as miss");
            }
        }

        metrics::counter!(STATUS_CACHE, "outcome" => "miss").increment(1);
        let observed =
            with_timeout(self.provider_timeout, provider.get_trip_status(trip_id)).await?;
        let status = self.write_through(provider.id(), trip_id, observed).await?;

        Ok(ResolvedStatus {
            status,
            trip_id: Some(trip_id.clone()),
            source: StatusSource::Provider,
        })
    }

    /// Record `observed` for `trip_id` in the durable store, then the cache.
    ///
    /// The store applies the transition atomically, so a terminal stored
    /// status is kept when `observed` would move it elsewhere, even against
    /// a concurrent writer. The status actually stored is cached and
    /// returned. The cache is never written if the durable write failed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the durable write fails. Cache failures are
    /// logged only.
    pub(crate) async fn write_through(
        &self,
        provider: &ProviderId,
        trip_id: &TripId,
        observed: RideStatus,
    ) -> Result<RideStatus> {
        let now = self.clock.now();

        let status = match self.trips.update_status(trip_id, observed, now).await? {
            Some(stored) => stored,
            None => {
                let record = TripRecord::dispatched(trip_id.clone(), provider.clone(), observed, now);
                if self.trips.insert_new(&record).await? {
                    observed
                } else {
                    // Another writer created the record first.
                    self.trips
                        .update_status(trip_id, observed, now)
                        .await?
                        .ok_or_else(|| {
                            RideError::InternalError(format!("Trip record {trip_id} vanished"))
                        })?
                }
            }
        };

        if status == observed {
            tracing::debug!(trip_id = %trip_id, status = %status, "Trip status recorded");
        } else {
            tracing::warn!(
                trip_id = %trip_id,
                stored = %status,
                observed = %observed,
                "Ignoring transition out of terminal status"
            );
        }

        let snapshot = StatusSnapshot {
            status,
            fetched_at: now,
        };
        if let Err(e) = self.cache.set(trip_id, snapshot, self.freshness).await {
            tracing::warn!(trip_id = %trip_id, error = %e, "Status cache write failed");
        }

        Ok(status)
    }
}
