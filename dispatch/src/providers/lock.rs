//! Distributed lock service for idempotency leases.

use crate::error::Result;
use std::time::Duration;

/// A held lease.
///
/// The token is unique per acquisition, so a holder whose lease expired and
/// was re-acquired by someone else cannot release the new lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Lock key.
    pub key: String,

    /// Random ownership token.
    pub token: String,

    /// Hard expiry granted at acquisition.
    pub ttl: Duration,
}

/// Mutual-exclusion leases with a hard expiry.
///
/// At most one live lease exists per key. Expiry is the only recovery for a
/// lease whose holder crashed; there is no renewal.
pub trait LockService: Send + Sync {
    /// Try to take the lease for `key`.
    ///
    /// Returns `None` if another live lease holds the key.
    ///
    /// # Errors
    ///
    /// Returns `RideError::LockError` if the lock backend is unreachable.
    fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<Option<Lease>>> + Send;

    /// Release `lease` if it is still the current holder.
    ///
    /// Returns `false` if the lease had already expired or been replaced.
    ///
    /// # Errors
    ///
    /// Returns `RideError::LockError` if the lock backend is unreachable.
    fn release(&self, lease: &Lease) -> impl std::future::Future<Output = Result<bool>> + Send;
}
