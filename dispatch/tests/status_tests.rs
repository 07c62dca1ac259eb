//! Integration tests for status resolution: cache freshness and write-through.

mod common;

use common::{payload, Harness};
use rideshare_dispatch::error::{ProviderError, RideError, ValidationError};
use rideshare_dispatch::mocks::MockRideProvider;
use rideshare_dispatch::providers::TripStore;
use rideshare_dispatch::state::{StatusQuery, StatusSource, TripId};
use rideshare_dispatch::{LocalRequestId, RideStatus};

fn by_trip(provider: Option<&str>, trip_id: &str) -> StatusQuery {
    StatusQuery {
        provider: provider.map(str::to_string),
        trip_id: Some(trip_id.to_string()),
        local_request_id: None,
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_fresh_cache_avoids_provider_call() {
    let h = Harness::with_provider(MockRideProvider::new("UBER").with_status(RideStatus::PickingUp));

    let first = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    let second = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();

    assert_eq!(first.source, StatusSource::Provider);
    assert_eq!(second.source, StatusSource::Cache);
    assert_eq!(second.status, RideStatus::PickingUp);
    assert_eq!(h.provider.status_calls(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_stale_cache_refreshes_and_records_change() {
    let h = Harness::with_provider(MockRideProvider::new("UBER").with_status(RideStatus::Pending));
    let trip = TripId::new("T123");

    h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    h.provider.set_status(RideStatus::InTransit);

    // Still fresh: the old answer stands.
    let cached = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    assert_eq!(cached.status, RideStatus::Pending);

    h.expire_cache();
    let refreshed = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();

    assert_eq!(refreshed.status, RideStatus::InTransit);
    assert_eq!(refreshed.source, StatusSource::Provider);
    assert_eq!(h.provider.status_calls(), 2);

    let record = h.trips.get_by_trip_id(&trip).await.unwrap().unwrap();
    assert_eq!(record.status, RideStatus::InTransit);
    assert!(record.updated_at > record.created_at);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_terminal_status_is_not_overwritten() {
    let h = Harness::with_provider(MockRideProvider::new("UBER").with_status(RideStatus::Pending));

    h.service.cancel_ride(Some("UBER"), Some("T123")).await.unwrap();

    // Provider flip-flops after the cancel.
    h.provider.set_status(RideStatus::PickingUp);
    h.expire_cache();

    let status = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    assert_eq!(status.status, RideStatus::Canceled);

    let record = h.trips.get_by_trip_id(&TripId::new("T123")).await.unwrap().unwrap();
    assert_eq!(record.status, RideStatus::Canceled);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_cache_read_failure_falls_back_to_provider() {
    let h = Harness::with_provider(MockRideProvider::new("UBER").with_status(RideStatus::InTransit));
    h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    h.cache.fail_reads(true);

    let status = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();

    assert_eq!(status.status, RideStatus::InTransit);
    assert_eq!(status.source, StatusSource::Provider);
    assert_eq!(h.provider.status_calls(), 2);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_durable_write_failure_skips_cache() {
    let h = Harness::with_provider(MockRideProvider::new("UBER").with_status(RideStatus::PickingUp));
    h.trips.fail_writes(true);

    let result = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await;
    assert!(matches!(result, Err(RideError::DatabaseError(_))));

    // Nothing was cached, so the next lookup goes back to the provider.
    h.trips.fail_writes(false);
    let status = h.service.ride_status(&by_trip(Some("UBER"), "T123")).await.unwrap();
    assert_eq!(status.source, StatusSource::Provider);
    assert_eq!(h.provider.status_calls(), 2);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_provider_failure_is_surfaced() {
    let h = Harness::with_provider(
        MockRideProvider::new("UBER").with_status_error(ProviderError::Api {
            status: 404,
            message: "Request not found".into(),
        }),
    );

    let err = h
        .service
        .ride_status(&by_trip(Some("UBER"), "T404"))
        .await
        .unwrap_err();

    assert!(matches!(err, RideError::Provider(ProviderError::Api { status: 404, .. })));
    assert!(h.trips.records().is_empty());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_provider_inferred_from_stored_record() {
    let h = Harness::new();
    h.service
        .create_ride("10.0.0.1", &payload("EMERGENCY"), None)
        .await
        .unwrap();

    let status = h.service.ride_status(&by_trip(None, "T123")).await.unwrap();
    assert_eq!(status.status, RideStatus::Pending);

    let err = h.service.ride_status(&by_trip(None, "T999")).await.unwrap_err();
    assert_eq!(err, RideError::Validation(ValidationError::MissingProvider));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_unknown_local_request_id_is_not_found() {
    let h = Harness::new();
    let query = StatusQuery {
        provider: Some("UBER".to_string()),
        trip_id: None,
        local_request_id: Some(LocalRequestId::generate().to_string()),
    };

    let err = h.service.ride_status(&query).await.unwrap_err();
    assert!(matches!(err, RideError::TripNotFound { .. }));
    assert_eq!(err.code(), "TRIP_NOT_FOUND");
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_missing_or_malformed_reference_is_rejected() {
    let h = Harness::new();

    let empty = StatusQuery {
        provider: Some("UBER".to_string()),
        ..StatusQuery::default()
    };
    let err = h.service.ride_status(&empty).await.unwrap_err();
    assert_eq!(err, RideError::Validation(ValidationError::MissingTripReference));

    let malformed = StatusQuery {
        provider: Some("UBER".to_string()),
        trip_id: None,
        local_request_id: Some("not-a-uuid".to_string()),
    };
    let err = h.service.ride_status(&malformed).await.unwrap_err();
    assert_eq!(err, RideError::Validation(ValidationError::InvalidLocalRequestId));

    assert_eq!(h.provider.status_calls(), 0);
}
