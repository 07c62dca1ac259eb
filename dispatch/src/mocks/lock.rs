//! Mock lock service for testing.

use crate::environment::{Clock, SystemClock};
use crate::error::{RideError, Result};
use crate::providers::{Lease, LockService};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// In-memory lease table with clock-driven expiry.
///
/// Acquisition is a single check-and-insert under one mutex, so concurrent
/// acquirers of the same key see exactly one winner.
#[derive(Clone)]
pub struct MockLockService {
    /// key -> (token, expires_at)
    leases: Arc<Mutex<HashMap<String, (String, DateTime<Utc>)>>>,
    clock: Arc<dyn Clock>,
}

impl MockLockService {
    /// Lock service on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Lock service whose leases expire against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            leases: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Whether a live lease holds `key`.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.leases
            .lock()
            .map(|leases| leases.get(key).is_some_and(|(_, expires_at)| *expires_at > now))
            .unwrap_or(false)
    }
}

impl Default for MockLockService {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService for MockLockService {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<Lease>> {
        let now = self.clock.now();
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        if let Some((_, expires_at)) = leases.get(key) {
            if *expires_at > now {
                return Ok(None);
            }
        }

        let token = Uuid::new_v4().to_string();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        leases.insert(key.to_string(), (token.clone(), expires_at));

        Ok(Some(Lease {
            key: key.to_string(),
            token,
            ttl,
        }))
    }

    async fn release(&self, lease: &Lease) -> Result<bool> {
        let now = self.clock.now();
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        let owned = leases
            .get(&lease.key)
            .is_some_and(|(token, expires_at)| *token == lease.token && *expires_at > now);
        if owned {
            leases.remove(&lease.key);
        }
        Ok(owned)
    }
}
