//! Dispatch router: ride creation.
//!
//! Given a validated [`RideRequest`], branches solely on priority:
//!
//! ```text
//!                 ┌── EMERGENCY ──▶ adapter.request_trip (inline) ──▶ {tripId}
//! lease(key) ─────┤
//!                 └── NORMAL ─────▶ record PENDING ─▶ enqueue job ──▶ {localRequestId, pending}
//! ```
//!
//! Both branches run under the idempotency lease. For the async branch the
//! lease only covers submission; the queue's delivery guarantee covers the
//! rest.

use crate::constants::metrics::CREATE_DISPATCHED;
use crate::coordinator::LockCoordinator;
use crate::environment::Clock;
use crate::error::Result;
use crate::providers::{LockService, RideProvider, RideQueue, TripStore, with_timeout};
use crate::state::{
    CreateRideJob, CreateRideOutcome, IdempotencyKey, LocalRequestId, RidePriority, RideRequest,
    RideStatus, TripRecord,
};
use std::sync::Arc;
use std::time::Duration;

/// Ride-creation router.
#[derive(Clone)]
pub struct DispatchRouter<S, Q, L> {
    trips: S,
    queue: Q,
    coordinator: LockCoordinator<L>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
}

impl<S, Q, L> DispatchRouter<S, Q, L>
where
    S: TripStore,
    Q: RideQueue,
    L: LockService,
{
    /// Create a router.
    #[must_use]
    pub fn new(
        trips: S,
        queue: Q,
        coordinator: LockCoordinator<L>,
        clock: Arc<dyn Clock>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            trips,
            queue,
            coordinator,
            clock,
            provider_timeout,
        }
    }

    /// Submit a validated request under the lease for `key`.
    ///
    /// # Errors
    ///
    /// - `DuplicateInFlight` if another submission holds the lease
    /// - `Provider` if the inline call fails or times out (EMERGENCY)
    /// - `DatabaseError` / `QueueError` if the submission could not be
    ///   recorded or enqueued (NORMAL)
    pub async fn dispatch(
        &self,
        provider: &dyn RideProvider,
        requester: &str,
        key: &IdempotencyKey,
        request: RideRequest,
    ) -> Result<CreateRideOutcome> {
        self.coordinator
            .run_exclusive(key, async move {
                match request.priority {
                    RidePriority::Emergency => self.dispatch_inline(provider, &request).await,
                    RidePriority::Normal => self.enqueue(requester, request).await,
                }
            })
            .await
    }

    async fn dispatch_inline(
        &self,
        provider: &dyn RideProvider,
        request: &RideRequest,
    ) -> Result<CreateRideOutcome> {
        let handle = with_timeout(self.provider_timeout, provider.request_trip(request)).await?;

        metrics::counter!(CREATE_DISPATCHED, "path" => "sync").increment(1);
        tracing::info!(
            provider = %request.provider,
            trip_id = %handle.trip_id,
            "Emergency ride dispatched inline"
        );

        // The ride exists at the provider; a failed record write must not
        // turn that into a client-visible failure.
        let record = TripRecord::dispatched(
            handle.trip_id.clone(),
            request.provider.clone(),
            handle.status,
            self.clock.now(),
        );
        if let Err(e) = self.trips.save(&record).await {
            tracing::error!(trip_id = %handle.trip_id, error = %e, "Failed to record dispatched trip");
        }

        Ok(CreateRideOutcome::Dispatched {
            trip_id: handle.trip_id,
        })
    }

    async fn enqueue(&self, requester: &str, request: RideRequest) -> Result<CreateRideOutcome> {
        let local_request_id = LocalRequestId::generate();
        let now = self.clock.now();

        // Record first, so a poll by local id never races the worker.
        let record = TripRecord::queued(local_request_id, request.provider.clone(), now);
        self.trips.save(&record).await?;

        let job = CreateRideJob {
            local_request_id,
            requester: requester.to_string(),
            request,
            enqueued_at: now,
        };

        if let Err(e) = self.queue.enqueue(job).await {
            tracing::error!(
                local_request_id = %local_request_id,
                error = %e,
                "Failed to enqueue ride request"
            );
            let failed = record.with_status(RideStatus::Error, self.clock.now());
            if let Err(save_err) = self.trips.save(&failed).await {
                tracing::warn!(
                    local_request_id = %local_request_id,
                    error = %save_err,
                    "Failed to mark unqueued request as ERROR"
                );
            }
            return Err(e);
        }

        metrics::counter!(CREATE_DISPATCHED, "path" => "async").increment(1);
        tracing::info!(local_request_id = %local_request_id, "Ride request queued");

        Ok(CreateRideOutcome::Queued { local_request_id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, RideError};
    use crate::mocks::{MockLockService, MockRideProvider, MockRideQueue, MockTripStore};
    use crate::state::{LatLong, ProviderId, TripId};
    use crate::environment::SystemClock;

    fn request(priority: RidePriority) -> RideRequest {
        RideRequest {
            priority,
            provider: ProviderId::new("UBER"),
            start: LatLong { latitude: "1.0".into(), longitude: "1.0".into() },
            end: LatLong { latitude: "2.0".into(), longitude: "2.0".into() },
            product_id: "abc".into(),
            fare_id: None,
            upfront_fare_enabled: false,
        }
    }

    fn router(
        trips: MockTripStore,
        queue: MockRideQueue,
    ) -> DispatchRouter<MockTripStore, MockRideQueue, MockLockService> {
        DispatchRouter::new(
            trips,
            queue,
            LockCoordinator::new(MockLockService::new(), Duration::from_secs(30)),
            Arc::new(SystemClock),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_emergency_calls_provider_once_and_never_enqueues() {
        let trips = MockTripStore::new();
        let queue = MockRideQueue::new();
        let provider = MockRideProvider::new("UBER").with_trip_id("T123");
        let router = router(trips.clone(), queue.clone());
        let req = request(RidePriority::Emergency);
        let key = IdempotencyKey::derive("alice", &req);

        let outcome = router.dispatch(&provider, "alice", &key, req).await.unwrap();

        assert_eq!(
            outcome,
            CreateRideOutcome::Dispatched { trip_id: TripId::new("T123") }
        );
        assert_eq!(provider.request_trip_calls(), 1);
        assert_eq!(queue.len(), 0);
        assert!(trips.get_by_trip_id(&TripId::new("T123")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_emergency_timeout_is_provider_error() {
        let provider = MockRideProvider::new("UBER").with_delay(Duration::from_secs(2));
        let router = router(MockTripStore::new(), MockRideQueue::new());
        let req = request(RidePriority::Emergency);
        let key = IdempotencyKey::derive("alice", &req);

        let result = router.dispatch(&provider, "alice", &key, req).await;

        assert!(matches!(
            result,
            Err(RideError::Provider(ProviderError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn test_normal_enqueues_without_calling_provider() {
        let trips = MockTripStore::new();
        let queue = MockRideQueue::new();
        let provider = MockRideProvider::new("UBER");
        let router = router(trips.clone(), queue.clone());
        let req = request(RidePriority::Normal);
        let key = IdempotencyKey::derive("alice", &req);

        let outcome = router.dispatch(&provider, "alice", &key, req).await.unwrap();

        let CreateRideOutcome::Queued { local_request_id } = outcome else {
            unreachable!("normal priority must queue");
        };
        assert_eq!(provider.request_trip_calls(), 0);
        assert_eq!(queue.len(), 1);

        let record = trips.get_by_local_request_id(&local_request_id).await.unwrap().unwrap();
        assert_eq!(record.status, RideStatus::Pending);
        assert!(record.trip_id.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_failure_marks_record_error() {
        let trips = MockTripStore::new();
        let queue = MockRideQueue::new();
        queue.fail_enqueue(true);
        let router = router(trips.clone(), queue.clone());
        let req = request(RidePriority::Normal);
        let key = IdempotencyKey::derive("alice", &req);

        let result = router
            .dispatch(&MockRideProvider::new("UBER"), "alice", &key, req)
            .await;

        assert!(matches!(result, Err(RideError::QueueError(_))));
        let records = trips.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RideStatus::Error);
    }

    #[tokio::test]
    async fn test_lease_released_after_submission() {
        let router = router(MockTripStore::new(), MockRideQueue::new());
        let provider = MockRideProvider::new("UBER");
        let req = request(RidePriority::Normal);
        let key = IdempotencyKey::derive("alice", &req);

        router.dispatch(&provider, "alice", &key, req.clone()).await.unwrap();
        // Sequential resubmission is a new submission, not a duplicate.
        assert!(router.dispatch(&provider, "alice", &key, req).await.is_ok());
    }
}
