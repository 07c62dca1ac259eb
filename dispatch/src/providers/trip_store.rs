//! Durable trip record store.

use crate::error::Result;
use crate::state::{LocalRequestId, RideStatus, TripId, TripRecord};
use chrono::{DateTime, Utc};

/// Durable store of canonical trip records.
///
/// Records are keyed by provider trip id and/or local request id. They are
/// never deleted, only moved to a terminal status.
///
/// # Writers
///
/// Status changes go through the status resolver's write-through or the
/// cancellation path. The dispatcher and the creation worker only create
/// records and attach provider trip ids.
pub trait TripStore: Send + Sync {
    /// Look up a record by provider trip id.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the store is unreachable.
    fn get_by_trip_id(
        &self,
        trip_id: &TripId,
    ) -> impl std::future::Future<Output = Result<Option<TripRecord>>> + Send;

    /// Look up a record by local request id.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the store is unreachable.
    fn get_by_local_request_id(
        &self,
        local_request_id: &LocalRequestId,
    ) -> impl std::future::Future<Output = Result<Option<TripRecord>>> + Send;

    /// Insert or replace a record.
    ///
    /// A record carrying a local request id replaces the record with that
    /// local id; otherwise it replaces the record with its trip id. After a
    /// save, the record is reachable by every id it carries.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the write fails.
    fn save(&self, record: &TripRecord) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Insert `record` unless a record already exists under one of its ids.
    ///
    /// Returns `false`, leaving the store untouched, if one did.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the write fails.
    fn insert_new(
        &self,
        record: &TripRecord,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Move the record with `trip_id` to `status`.
    ///
    /// The check and the write are one atomic step: a terminal stored status
    /// is kept unless [`RideStatus::can_transition_to`] allows `status`.
    /// Returns the status stored afterwards, or `None` if no such record
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the write fails.
    fn update_status(
        &self,
        trip_id: &TripId,
        status: RideStatus,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<RideStatus>>> + Send;
}
