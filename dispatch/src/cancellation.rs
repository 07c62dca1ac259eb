//! Cancellation state machine.
//!
//! Current status is always resolved first; the provider is never asked to
//! cancel a trip whose state has not been confirmed.
//!
//! | Current status                          | Action                              |
//! |-----------------------------------------|-------------------------------------|
//! | `CANCELED`                              | none, reports already canceled      |
//! | `DROPPING_OFF`, `COMPLETED`             | none, `StaleState` conflict         |
//! | `PENDING`, `PICKING_UP`, `IN_TRANSIT`, `ERROR` | provider cancel, record `CANCELED` |

use crate::constants::metrics::CANCEL_OUTCOME;
use crate::error::{RideError, Result};
use crate::providers::{RideProvider, StatusCache, TripStore, with_timeout};
use crate::state::{CancelOutcome, RideStatus, TripId};
use crate::status::StatusResolver;
use std::time::Duration;

/// Applies cancellation transition rules.
#[derive(Clone)]
pub struct CancellationMachine<S, C> {
    resolver: StatusResolver<S, C>,
    provider_timeout: Duration,
}

impl<S, C> CancellationMachine<S, C>
where
    S: TripStore,
    C: StatusCache,
{
    /// Create a state machine over `resolver`.
    #[must_use]
    pub const fn new(resolver: StatusResolver<S, C>, provider_timeout: Duration) -> Self {
        Self {
            resolver,
            provider_timeout,
        }
    }

    /// Cancel `trip_id` if its current status allows it.
    ///
    /// # Errors
    ///
    /// - `StaleState` if the trip is dropping off or completed
    /// - `Provider` if the status lookup or the cancel call fails; the
    ///   stored record is left untouched
    /// - `DatabaseError` if the canceled status could not be recorded
    pub async fn cancel(
        &self,
        provider: &dyn RideProvider,
        trip_id: &TripId,
    ) -> Result<CancelOutcome> {
        let current = self.resolver.resolve_trip(provider, trip_id).await?;

        match current.status {
            RideStatus::Canceled => {
                metrics::counter!(CANCEL_OUTCOME, "outcome" => "already_canceled").increment(1);
                tracing::info!(trip_id = %trip_id, "Trip was already canceled");
                Ok(CancelOutcome::AlreadyCanceled)
            }
            status @ (RideStatus::DroppingOff | RideStatus::Completed) => {
                metrics::counter!(CANCEL_OUTCOME, "outcome" => "rejected").increment(1);
                tracing::warn!(trip_id = %trip_id, status = %status, "Refusing to cancel trip");
                Err(RideError::StaleState {
                    trip_id: trip_id.clone(),
                    status,
                })
            }
            status @ (RideStatus::Pending
            | RideStatus::PickingUp
            | RideStatus::InTransit
            | RideStatus::Error) => {
                with_timeout(self.provider_timeout, provider.cancel_trip(trip_id)).await?;
                self.resolver
                    .write_through(provider.id(), trip_id, RideStatus::Canceled)
                    .await?;

                metrics::counter!(CANCEL_OUTCOME, "outcome" => "canceled").increment(1);
                tracing::info!(trip_id = %trip_id, from = %status, "Trip canceled");
                Ok(CancelOutcome::Canceled)
            }
        }
    }
}
