//! Ride dispatch domain types.
//!
//! Inbound payloads arrive loosely typed ([`RideRequestPayload`]) and only a
//! successful validation produces the strongly typed [`RideRequest`]. Trip
//! state lives in [`TripRecord`], owned by the durable store.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════

/// Rideshare provider identifier (e.g. `UBER`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a provider identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Provider-assigned trip identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl TripId {
    /// Wrap a provider trip identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation token issued for asynchronous create requests.
///
/// Random per submission, never derived from request content, so two
/// identical submissions receive distinct identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalRequestId(Uuid);

impl LocalRequestId {
    /// Issue a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLocalRequestId`] if the input is not
    /// a UUID.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidLocalRequestId)
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for LocalRequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for LocalRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A trip looked up either by provider trip id or by local request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripReference {
    /// Provider-assigned trip identifier.
    Trip(TripId),
    /// Local request identifier of an asynchronous submission.
    Local(LocalRequestId),
}

impl fmt::Display for TripReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trip(id) => write!(f, "trip {id}"),
            Self::Local(id) => write!(f, "local request {id}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════════════════

/// Declared urgency of a create request. Decides sync vs async dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RidePriority {
    /// Provider is called inline.
    Emergency,
    /// Request is queued for a worker.
    Normal,
}

impl RidePriority {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::Normal => "NORMAL",
        }
    }

    /// Parse a wire value. Exact match only.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "EMERGENCY" => Some(Self::Emergency),
            "NORMAL" => Some(Self::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for RidePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geocoordinate as received on the wire; either component may be absent.
///
/// Components are accepted as JSON strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatLongPayload {
    /// Decimal latitude.
    #[serde(deserialize_with = "decimal_text")]
    pub latitude: Option<String>,
    /// Decimal longitude.
    #[serde(deserialize_with = "decimal_text")]
    pub longitude: Option<String>,
}

fn decimal_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

impl LatLongPayload {
    /// Payload with both components set.
    #[must_use]
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
        }
    }
}

/// Validated geocoordinate. Both components are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatLong {
    /// Decimal latitude.
    pub latitude: String,
    /// Decimal longitude.
    pub longitude: String,
}

/// Raw create-ride body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RideRequestPayload {
    /// `EMERGENCY` or `NORMAL`.
    pub ride_priority: Option<String>,
    /// Provider identifier; must match the adapter handling the request.
    pub provider: Option<String>,
    /// Pickup location.
    pub start_lat_long: Option<LatLongPayload>,
    /// Drop-off location.
    pub end_lat_long: Option<LatLongPayload>,
    /// Provider product identifier.
    pub product_id: Option<String>,
    /// Whether an upfront fare was quoted.
    pub upfront_fare_enabled: Option<bool>,
    /// Quoted fare identifier.
    pub fare_id: Option<String>,
}

/// Normalized create-trip request. Only produced by successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    /// Urgency.
    pub priority: RidePriority,
    /// Provider the request is bound for.
    pub provider: ProviderId,
    /// Pickup location.
    pub start: LatLong,
    /// Drop-off location.
    pub end: LatLong,
    /// Provider product identifier, trimmed.
    pub product_id: String,
    /// Quoted fare identifier. Always present when `upfront_fare_enabled`.
    pub fare_id: Option<String>,
    /// Whether an upfront fare was quoted.
    pub upfront_fare_enabled: bool,
}

/// Status lookup input: a trip id, a local request id, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusQuery {
    /// Provider identifier. Optional when the stored record names it.
    pub provider: Option<String>,
    /// Provider trip identifier.
    pub trip_id: Option<String>,
    /// Local request identifier from an asynchronous create.
    pub local_request_id: Option<String>,
}

/// Idempotency key guarding a single logical create submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derive a key from the requester identity and the request signature.
    ///
    /// Two submissions of the same logical request by the same requester
    /// produce the same key.
    #[must_use]
    pub fn derive(requester: &str, request: &RideRequest) -> Self {
        let mut hasher = Sha256::new();
        for part in [
            "request",
            requester,
            request.provider.as_str(),
            request.priority.as_str(),
            &request.start.latitude,
            &request.start.longitude,
            &request.end.latitude,
            &request.end.longitude,
            &request.product_id,
            request.fare_id.as_deref().unwrap_or_default(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Key from an explicit client-supplied idempotency token, namespaced by
    /// requester so two clients cannot collide.
    #[must_use]
    pub fn from_client(requester: &str, token: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in ["client", requester, token] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Trip state
// ═══════════════════════════════════════════════════════════════════════

/// Normalized ride status.
///
/// `COMPLETED`, `CANCELED` and `ERROR` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    /// Accepted by us, not yet matched to a driver.
    Pending,
    /// Driver en route to pickup.
    #[serde(alias = "PICKING UP")]
    PickingUp,
    /// Rider on board.
    #[serde(alias = "IN TRANSIT")]
    InTransit,
    /// Arriving at the destination.
    DroppingOff,
    /// Trip finished.
    Completed,
    /// Trip canceled.
    Canceled,
    /// Trip could not be fulfilled.
    Error,
}

impl RideStatus {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PickingUp => "PICKING_UP",
            Self::InTransit => "IN_TRANSIT",
            Self::DroppingOff => "DROPPING_OFF",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
            Self::Error => "ERROR",
        }
    }

    /// Parse a wire value, accepting the legacy space-separated spellings.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "PICKING_UP" | "PICKING UP" => Some(Self::PickingUp),
            "IN_TRANSIT" | "IN TRANSIT" => Some(Self::InTransit),
            "DROPPING_OFF" => Some(Self::DroppingOff),
            "COMPLETED" => Some(Self::Completed),
            "CANCELED" => Some(Self::Canceled),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Terminal statuses never transition further.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Error)
    }

    /// Whether a stored status may be overwritten by `next`.
    ///
    /// Non-terminal statuses move freely. A terminal status only accepts an
    /// idempotent re-write of itself, plus `ERROR -> CANCELED` so a failed
    /// trip can still be canceled at the provider.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        !self.is_terminal() || *self == next || (*self == Self::Error && next == Self::Canceled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical state of a ride, owned by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    /// Provider-assigned identifier; absent until the provider accepts.
    pub trip_id: Option<TripId>,
    /// Correlation token for asynchronous submissions.
    pub local_request_id: Option<LocalRequestId>,
    /// Provider handling the trip.
    pub provider: ProviderId,
    /// Current status.
    pub status: RideStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl TripRecord {
    /// Record for a queued submission: PENDING, no trip id yet.
    #[must_use]
    pub const fn queued(
        local_request_id: LocalRequestId,
        provider: ProviderId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trip_id: None,
            local_request_id: Some(local_request_id),
            provider,
            status: RideStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record for a trip the provider already knows about.
    #[must_use]
    pub const fn dispatched(
        trip_id: TripId,
        provider: ProviderId,
        status: RideStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trip_id: Some(trip_id),
            local_request_id: None,
            provider,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the provider trip id once the provider accepted the request.
    #[must_use]
    pub fn accepted(mut self, trip_id: TripId, status: RideStatus, now: DateTime<Utc>) -> Self {
        self.trip_id = Some(trip_id);
        self.status = status;
        self.updated_at = now;
        self
    }

    /// Same record with a new status.
    #[must_use]
    pub const fn with_status(mut self, status: RideStatus, now: DateTime<Utc>) -> Self {
        self.status = status;
        self.updated_at = now;
        self
    }
}

/// Cached status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Status observed at the provider.
    pub status: RideStatus,
    /// When it was observed.
    pub fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Whether the snapshot may still be served at `now`.
    ///
    /// A snapshot whose age has reached `horizon` is a miss.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        // Negative age (clock skew) counts as fresh.
        now.signed_duration_since(self.fetched_at)
            .to_std()
            .map_or(true, |age| age < horizon)
    }
}

/// Where a resolved status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// Durable record of a submission not yet accepted by the provider.
    Record,
    /// Fresh cache entry.
    Cache,
    /// Live provider lookup.
    Provider,
}

/// Result of a status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatus {
    /// Current status.
    pub status: RideStatus,
    /// Trip id, when the provider has assigned one.
    pub trip_id: Option<TripId>,
    /// Origin of the answer.
    pub source: StatusSource,
}

// ═══════════════════════════════════════════════════════════════════════
// Provider results
// ═══════════════════════════════════════════════════════════════════════

/// Provider acknowledgement of a trip request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTripHandle {
    /// Provider-assigned identifier.
    pub trip_id: TripId,
    /// Status reported with the acknowledgement.
    pub status: RideStatus,
}

/// Assigned driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Display name.
    pub name: String,
    /// Contact number, if shared.
    pub phone_number: Option<String>,
    /// Average rating.
    pub rating: Option<f64>,
}

/// Assigned vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Manufacturer.
    pub make: String,
    /// Model.
    pub model: String,
    /// Registration plate.
    pub license_plate: String,
}

/// Full trip details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    /// Provider trip identifier.
    pub trip_id: TripId,
    /// Current status.
    pub status: RideStatus,
    /// Assigned driver, once matched.
    pub driver: Option<Driver>,
    /// Assigned vehicle, once matched.
    pub vehicle: Option<Vehicle>,
    /// Minutes until pickup.
    pub pickup_eta_minutes: Option<u32>,
}

/// Kind of estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimateKind {
    /// Pickup time estimates.
    Time,
    /// Fare estimates.
    Price,
}

/// Fare range for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    /// Human-readable estimate (e.g. `$15-20`).
    pub estimate: String,
    /// Lower bound.
    pub low_estimate: Option<f64>,
    /// Upper bound.
    pub high_estimate: Option<f64>,
    /// ISO currency code.
    pub currency_code: Option<String>,
}

/// Per-product estimate line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateEntry {
    /// Provider product identifier.
    pub product_id: String,
    /// Product display name.
    pub display_name: String,
    /// Seconds until pickup (time estimates).
    pub duration_seconds: Option<u32>,
    /// Fare range (price estimates).
    pub price: Option<PriceEstimate>,
}

/// Time or price estimate across products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    /// Which estimate this is.
    pub kind: EstimateKind,
    /// One entry per product.
    pub entries: Vec<EstimateEntry>,
}

/// Product offered at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Provider product identifier.
    pub product_id: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Seats.
    pub capacity: u32,
}

/// Products available at a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    /// Available products.
    pub products: Vec<Product>,
}

// ═══════════════════════════════════════════════════════════════════════
// Outcomes and jobs
// ═══════════════════════════════════════════════════════════════════════

/// Result of a create submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRideOutcome {
    /// Emergency path: the provider accepted inline.
    Dispatched {
        /// Provider trip identifier.
        trip_id: TripId,
    },
    /// Normal path: queued for a worker.
    Queued {
        /// Token to poll status with.
        local_request_id: LocalRequestId,
    },
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Provider canceled the trip.
    Canceled,
    /// Trip was already canceled; nothing was sent to the provider.
    AlreadyCanceled,
}

impl CancelOutcome {
    /// Client-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Canceled => crate::constants::messages::TRIP_CANCELED,
            Self::AlreadyCanceled => crate::constants::messages::ALREADY_CANCELED,
        }
    }
}

/// Ride-creation job handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideJob {
    /// Correlation token returned to the client.
    pub local_request_id: LocalRequestId,
    /// Requester identity, for diagnostics.
    pub requester: String,
    /// Validated request.
    pub request: RideRequest,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> RideRequest {
        RideRequest {
            priority: RidePriority::Normal,
            provider: ProviderId::new("UBER"),
            start: LatLong { latitude: "1.0".into(), longitude: "1.0".into() },
            end: LatLong { latitude: "2.0".into(), longitude: "2.0".into() },
            product_id: "abc".into(),
            fare_id: None,
            upfront_fare_enabled: false,
        }
    }

    #[test]
    fn test_status_wire_values() {
        for status in [
            RideStatus::Pending,
            RideStatus::PickingUp,
            RideStatus::InTransit,
            RideStatus::DroppingOff,
            RideStatus::Completed,
            RideStatus::Canceled,
            RideStatus::Error,
        ] {
            assert_eq!(RideStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RideStatus::parse("PICKING UP"), Some(RideStatus::PickingUp));
        assert_eq!(RideStatus::parse("picking_up"), None);
    }

    #[test]
    fn test_status_serde_accepts_legacy_spelling() {
        let status: RideStatus = serde_json::from_str("\"IN TRANSIT\"").unwrap();
        assert_eq!(status, RideStatus::InTransit);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"IN_TRANSIT\"");
    }

    #[test]
    fn test_terminal_statuses_only_allow_idempotent_rewrites() {
        assert!(RideStatus::Pending.can_transition_to(RideStatus::InTransit));
        assert!(RideStatus::InTransit.can_transition_to(RideStatus::Pending));
        assert!(RideStatus::Completed.can_transition_to(RideStatus::Completed));
        assert!(!RideStatus::Completed.can_transition_to(RideStatus::Canceled));
        assert!(!RideStatus::Canceled.can_transition_to(RideStatus::Pending));
        assert!(RideStatus::Error.can_transition_to(RideStatus::Canceled));
        assert!(!RideStatus::Error.can_transition_to(RideStatus::Pending));
    }

    #[test]
    fn test_snapshot_freshness_boundary() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let snapshot = StatusSnapshot { status: RideStatus::InTransit, fetched_at };
        let horizon = Duration::from_secs(30);

        assert!(snapshot.is_fresh(fetched_at + chrono::Duration::seconds(29), horizon));
        assert!(!snapshot.is_fresh(fetched_at + chrono::Duration::seconds(30), horizon));
        assert!(snapshot.is_fresh(fetched_at - chrono::Duration::seconds(5), horizon));
    }

    #[test]
    fn test_idempotency_key_is_stable_per_requester() {
        let a = IdempotencyKey::derive("alice", &request());
        let b = IdempotencyKey::derive("alice", &request());
        let c = IdempotencyKey::derive("bob", &request());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_idempotency_key_changes_with_request_signature() {
        let mut other = request();
        other.product_id = "xyz".into();
        assert_ne!(
            IdempotencyKey::derive("alice", &request()),
            IdempotencyKey::derive("alice", &other)
        );
        assert_ne!(
            IdempotencyKey::from_client("alice", "k1"),
            IdempotencyKey::from_client("bob", "k1")
        );
    }

    #[test]
    fn test_local_request_ids_are_unique() {
        assert_ne!(LocalRequestId::generate(), LocalRequestId::generate());
        assert!(LocalRequestId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let payload: RideRequestPayload = serde_json::from_str(
            r#"{"ridePriority":"NORMAL","provider":"UBER","startLatLong":{"latitude":"1.0"},"productId":"abc"}"#,
        )
        .unwrap();
        assert_eq!(payload.ride_priority.as_deref(), Some("NORMAL"));
        assert_eq!(payload.start_lat_long.unwrap().longitude, None);
        assert!(payload.end_lat_long.is_none());
    }

    #[test]
    fn test_coordinates_accept_numbers() {
        let point: LatLongPayload =
            serde_json::from_str(r#"{"latitude":37.7749,"longitude":"-122.4194"}"#).unwrap();
        assert_eq!(point.latitude.as_deref(), Some("37.7749"));
        assert_eq!(point.longitude.as_deref(), Some("-122.4194"));

        let point: LatLongPayload = serde_json::from_str(r#"{"latitude":null}"#).unwrap();
        assert_eq!(point, LatLongPayload::default());
    }
}
