//! Idempotency lock coordinator.
//!
//! Wraps a [`LockService`] with the submission discipline: one live lease
//! per idempotency key, a contended key is a [`RideError::DuplicateInFlight`]
//! (never a silent retry or merge), and the lease is released as soon as the
//! guarded work completes, whichever way it completes.

use crate::constants::metrics::CREATE_DUPLICATE;
use crate::error::{RideError, Result};
use crate::providers::{Lease, LockService};
use crate::state::IdempotencyKey;
use std::future::Future;
use std::time::Duration;

/// Grants and releases idempotency leases.
#[derive(Debug, Clone)]
pub struct LockCoordinator<L> {
    locks: L,
    ttl: Duration,
}

impl<L: LockService> LockCoordinator<L> {
    /// Coordinator issuing leases that expire after `ttl`.
    #[must_use]
    pub const fn new(locks: L, ttl: Duration) -> Self {
        Self { locks, ttl }
    }

    /// Take the lease for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::DuplicateInFlight`] if the key is held, or
    /// [`RideError::LockError`] if the lock service failed.
    pub async fn acquire(&self, key: &IdempotencyKey) -> Result<Lease> {
        match self.locks.acquire(key.as_str(), self.ttl).await? {
            Some(lease) => Ok(lease),
            None => {
                metrics::counter!(CREATE_DUPLICATE).increment(1);
                tracing::info!(key = %key, "Rejected duplicate in-flight submission");
                Err(RideError::DuplicateInFlight {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Release `lease`. Failures are logged; expiry reclaims the key anyway.
    pub async fn release(&self, lease: &Lease) {
        match self.locks.release(lease).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(key = %lease.key, "Lease expired before release");
            }
            Err(e) => {
                tracing::warn!(key = %lease.key, error = %e, "Failed to release lease");
            }
        }
    }

    /// Run `work` while holding the lease for `key`.
    ///
    /// `work` is not started unless the lease is acquired. The lease is
    /// released after `work` finishes with either outcome. If the returned
    /// future is dropped mid-flight, the lease lapses at its expiry.
    ///
    /// # Errors
    ///
    /// Returns the acquisition error, or whatever `work` returns.
    pub async fn run_exclusive<T, F>(&self, key: &IdempotencyKey, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let lease = self.acquire(key).await?;
        let result = work.await;
        self.release(&lease).await;
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockClock, MockLockService};
    use std::sync::Arc;

    fn key(name: &str) -> IdempotencyKey {
        IdempotencyKey::from_client("tester", name)
    }

    #[tokio::test]
    async fn test_second_acquire_is_duplicate() {
        let coordinator = LockCoordinator::new(MockLockService::new(), Duration::from_secs(30));

        let _lease = coordinator.acquire(&key("a")).await.unwrap();
        let second = coordinator.acquire(&key("a")).await;

        assert!(matches!(second, Err(RideError::DuplicateInFlight { .. })));
        assert!(coordinator.acquire(&key("b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_exclusive_releases_on_failure() {
        let locks = MockLockService::new();
        let coordinator = LockCoordinator::new(locks.clone(), Duration::from_secs(30));

        let result: Result<()> = coordinator
            .run_exclusive(&key("a"), async {
                Err(RideError::InternalError("boom".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(!locks.is_held(key("a").as_str()));
        assert!(coordinator.acquire(&key("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_lease_frees_key() {
        let clock = Arc::new(MockClock::new());
        let locks = MockLockService::with_clock(clock.clone());
        let coordinator = LockCoordinator::new(locks, Duration::from_secs(30));

        let stale = coordinator.acquire(&key("a")).await.unwrap();
        clock.advance(Duration::from_secs(31));

        let fresh = coordinator.acquire(&key("a")).await.unwrap();
        assert_ne!(stale.token, fresh.token);

        // The previous holder must not be able to free the new lease.
        coordinator.release(&stale).await;
        assert!(matches!(
            coordinator.acquire(&key("a")).await,
            Err(RideError::DuplicateInFlight { .. })
        ));
    }
}
