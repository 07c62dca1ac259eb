//! Fast trip-status cache.

use crate::error::Result;
use crate::state::{StatusSnapshot, TripId};
use std::time::Duration;

/// Cache of recent status snapshots keyed by trip id.
///
/// Expired entries should disappear on their own, but readers still check
/// [`StatusSnapshot::is_fresh`] and treat an old snapshot as a miss.
pub trait StatusCache: Send + Sync {
    /// Read the snapshot for `trip_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RideError::CacheError` if the cache is unreachable.
    fn get(
        &self,
        trip_id: &TripId,
    ) -> impl std::future::Future<Output = Result<Option<StatusSnapshot>>> + Send;

    /// Store a snapshot that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `RideError::CacheError` if the write fails.
    fn set(
        &self,
        trip_id: &TripId,
        snapshot: StatusSnapshot,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
