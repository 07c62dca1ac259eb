//! Request-shape validation shared by every provider adapter.
//!
//! Validation is a pure function of its input: no mutation, no I/O. Each
//! check returns the specific [`ValidationError`] so the reason can be logged,
//! while callers surface only the generic "Could not validate input!" message.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. priority is `EMERGENCY` or `NORMAL`
//! 2. payload provider equals the adapter identity
//! 3. start location has both components
//! 4. end location has both components
//! 5. product id is non-blank
//! 6. upfront fare implies a fare id

use crate::error::ValidationError;
use crate::state::{
    LatLong, LatLongPayload, LocalRequestId, ProviderId, RidePriority, RideRequest,
    RideRequestPayload, StatusQuery, TripId, TripReference,
};

/// Trim `raw`, treating blank as absent.
fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Coordinate component: present, non-blank, and a finite decimal.
fn coordinate(raw: Option<&str>) -> Option<String> {
    let value = non_blank(raw)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .map(|_| value.to_string())
}

/// Validate a geocoordinate, failing with `error` if any component is missing.
///
/// # Errors
///
/// Returns `error` if the location is absent or either component is blank or
/// not a decimal number.
pub fn require_location(
    location: Option<&LatLongPayload>,
    error: ValidationError,
) -> Result<LatLong, ValidationError> {
    let location = location.ok_or_else(|| error.clone())?;
    match (
        coordinate(location.latitude.as_deref()),
        coordinate(location.longitude.as_deref()),
    ) {
        (Some(latitude), Some(longitude)) => Ok(LatLong { latitude, longitude }),
        _ => Err(error),
    }
}

/// Check that the payload names the adapter's own provider.
///
/// # Errors
///
/// Returns [`ValidationError::ProviderMismatch`] if the provider is absent or
/// different.
pub fn require_provider(
    expected: &ProviderId,
    actual: Option<&str>,
) -> Result<(), ValidationError> {
    match actual {
        Some(actual) if actual == expected.as_str() => Ok(()),
        actual => Err(ValidationError::ProviderMismatch {
            expected: expected.to_string(),
            actual: actual.unwrap_or_default().to_string(),
        }),
    }
}

/// Validate a create-ride payload for the adapter identified by `expected`.
///
/// # Errors
///
/// Returns the first failing check, in the order listed in the module docs.
pub fn validate_create(
    expected: &ProviderId,
    payload: &RideRequestPayload,
) -> Result<RideRequest, ValidationError> {
    let priority = payload
        .ride_priority
        .as_deref()
        .and_then(RidePriority::parse)
        .ok_or(ValidationError::InvalidPriority)?;

    require_provider(expected, payload.provider.as_deref())?;

    let start = require_location(
        payload.start_lat_long.as_ref(),
        ValidationError::InvalidStartLocation,
    )?;
    let end = require_location(
        payload.end_lat_long.as_ref(),
        ValidationError::InvalidEndLocation,
    )?;

    let product_id = non_blank(payload.product_id.as_deref())
        .ok_or(ValidationError::InvalidProductId)?
        .to_string();

    let upfront_fare_enabled = payload.upfront_fare_enabled.unwrap_or(false);
    let fare_id = non_blank(payload.fare_id.as_deref()).map(ToString::to_string);
    if upfront_fare_enabled && fare_id.is_none() {
        return Err(ValidationError::FareIdRequired);
    }

    Ok(RideRequest {
        priority,
        provider: expected.clone(),
        start,
        end,
        product_id,
        fare_id,
        upfront_fare_enabled,
    })
}

/// Trip ids end up as a URL path segment at the provider, so anything that
/// could change which resource a request addresses is refused.
fn safe_trip_id(value: &str) -> Result<TripId, ValidationError> {
    let reserved = |c: char| {
        matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control()
    };
    if value == "." || value == ".." || value.contains(reserved) {
        return Err(ValidationError::InvalidTripId);
    }
    Ok(TripId::new(value))
}

/// Validate a trip identifier (cancel and details requests).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTripId`] if the id is absent, blank, a
/// dot segment, or contains path, query, fragment, escape or whitespace
/// characters.
pub fn validate_trip_id(raw: Option<&str>) -> Result<TripId, ValidationError> {
    non_blank(raw)
        .ok_or(ValidationError::InvalidTripId)
        .and_then(safe_trip_id)
}

/// Validate a status query. A trip id takes precedence over a local request id.
///
/// # Errors
///
/// Returns [`ValidationError::MissingTripReference`] if neither is given,
/// [`ValidationError::InvalidTripId`] if the trip id is unsafe, or
/// [`ValidationError::InvalidLocalRequestId`] if the local id is malformed.
pub fn validate_status_query(query: &StatusQuery) -> Result<TripReference, ValidationError> {
    if let Some(trip_id) = non_blank(query.trip_id.as_deref()) {
        return safe_trip_id(trip_id).map(TripReference::Trip);
    }
    match non_blank(query.local_request_id.as_deref()) {
        Some(local) => LocalRequestId::parse(local).map(TripReference::Local),
        None => Err(ValidationError::MissingTripReference),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uber() -> ProviderId {
        ProviderId::new("UBER")
    }

    fn valid_payload() -> RideRequestPayload {
        RideRequestPayload {
            ride_priority: Some("EMERGENCY".to_string()),
            provider: Some("UBER".to_string()),
            start_lat_long: Some(LatLongPayload::new("1.0", "1.0")),
            end_lat_long: Some(LatLongPayload::new("2.0", "2.0")),
            product_id: Some("abc".to_string()),
            upfront_fare_enabled: None,
            fare_id: None,
        }
    }

    #[test]
    fn test_valid_payload_produces_request() {
        let request = validate_create(&uber(), &valid_payload()).unwrap();
        assert_eq!(request.priority, RidePriority::Emergency);
        assert_eq!(request.start.latitude, "1.0");
        assert_eq!(request.product_id, "abc");
        assert!(!request.upfront_fare_enabled);
    }

    #[test]
    fn test_invalid_priority() {
        let mut payload = valid_payload();
        payload.ride_priority = Some("URGENT".to_string());
        assert_eq!(
            validate_create(&uber(), &payload),
            Err(ValidationError::InvalidPriority)
        );

        payload.ride_priority = None;
        assert_eq!(
            validate_create(&uber(), &payload),
            Err(ValidationError::InvalidPriority)
        );
    }

    #[test]
    fn test_provider_mismatch() {
        let mut payload = valid_payload();
        payload.provider = Some("LYFT".to_string());
        assert!(matches!(
            validate_create(&uber(), &payload),
            Err(ValidationError::ProviderMismatch { .. })
        ));
    }

    #[test]
    fn test_each_coordinate_component_is_required() {
        let cases: [fn(&mut RideRequestPayload); 4] = [
            |p| p.start_lat_long.as_mut().unwrap().latitude = None,
            |p| p.start_lat_long.as_mut().unwrap().longitude = Some("  ".to_string()),
            |p| p.end_lat_long.as_mut().unwrap().latitude = Some(String::new()),
            |p| p.end_lat_long.as_mut().unwrap().longitude = None,
        ];
        let expected = [
            ValidationError::InvalidStartLocation,
            ValidationError::InvalidStartLocation,
            ValidationError::InvalidEndLocation,
            ValidationError::InvalidEndLocation,
        ];

        for (mutate, expected) in cases.iter().zip(expected) {
            let mut payload = valid_payload();
            mutate(&mut payload);
            assert_eq!(validate_create(&uber(), &payload), Err(expected));
        }
    }

    #[test]
    fn test_non_numeric_coordinate_rejected() {
        let mut payload = valid_payload();
        payload.end_lat_long = Some(LatLongPayload::new("north", "2.0"));
        assert_eq!(
            validate_create(&uber(), &payload),
            Err(ValidationError::InvalidEndLocation)
        );
    }

    #[test]
    fn test_blank_product_id() {
        let mut payload = valid_payload();
        payload.product_id = Some("   ".to_string());
        assert_eq!(
            validate_create(&uber(), &payload),
            Err(ValidationError::InvalidProductId)
        );
    }

    #[test]
    fn test_upfront_fare_requires_fare_id() {
        let mut payload = valid_payload();
        payload.upfront_fare_enabled = Some(true);
        assert_eq!(
            validate_create(&uber(), &payload),
            Err(ValidationError::FareIdRequired)
        );

        payload.fare_id = Some("fare-1".to_string());
        let request = validate_create(&uber(), &payload).unwrap();
        assert_eq!(request.fare_id.as_deref(), Some("fare-1"));
    }

    #[test]
    fn test_status_query_prefers_trip_id() {
        let query = StatusQuery {
            provider: None,
            trip_id: Some("T123".to_string()),
            local_request_id: Some("garbage".to_string()),
        };
        assert_eq!(
            validate_status_query(&query),
            Ok(TripReference::Trip(TripId::new("T123")))
        );

        let empty = StatusQuery::default();
        assert_eq!(
            validate_status_query(&empty),
            Err(ValidationError::MissingTripReference)
        );
    }

    #[test]
    fn test_trip_id_must_be_non_blank() {
        assert_eq!(validate_trip_id(Some(" ")), Err(ValidationError::InvalidTripId));
        assert_eq!(validate_trip_id(Some("T1")), Ok(TripId::new("T1")));
    }

    #[test]
    fn test_trip_id_cannot_escape_its_path_segment() {
        for raw in ["../products", "..", ".", "T1/cancel", "T1?x=1", "T1#f", "%2e%2e", "T 1", "a\\b"] {
            assert_eq!(validate_trip_id(Some(raw)), Err(ValidationError::InvalidTripId), "{raw}");
        }
        assert_eq!(
            validate_trip_id(Some("a1b2c3d4-0000-4e5f-9a8b-1c2d3e4f5a6b")),
            Ok(TripId::new("a1b2c3d4-0000-4e5f-9a8b-1c2d3e4f5a6b"))
        );

        let query = StatusQuery {
            provider: Some("UBER".to_string()),
            trip_id: Some("../products".to_string()),
            local_request_id: None,
        };
        assert_eq!(validate_status_query(&query), Err(ValidationError::InvalidTripId));
    }

    proptest! {
        #[test]
        fn prop_finite_coordinates_validate(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            let mut payload = valid_payload();
            payload.start_lat_long = Some(LatLongPayload::new(lat.to_string(), lng.to_string()));
            prop_assert!(validate_create(&uber(), &payload).is_ok());
        }

        #[test]
        fn prop_whitespace_product_id_rejected(pad in "[ \t]{0,8}") {
            let mut payload = valid_payload();
            payload.product_id = Some(pad);
            prop_assert_eq!(
                validate_create(&uber(), &payload),
                Err(ValidationError::InvalidProductId)
            );
        }

        #[test]
        fn prop_unknown_priority_rejected(priority in "[A-Za-z]{1,12}") {
            prop_assume!(priority != "EMERGENCY" && priority != "NORMAL");
            let mut payload = valid_payload();
            payload.ride_priority = Some(priority);
            prop_assert_eq!(
                validate_create(&uber(), &payload),
                Err(ValidationError::InvalidPriority)
            );
        }
    }
}
