//! Mock status cache for testing.

use crate::environment::{Clock, SystemClock};
use crate::error::{RideError, Result};
use crate::providers::StatusCache;
use crate::state::{StatusSnapshot, TripId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory status cache with clock-driven expiry.
#[derive(Clone)]
pub struct MockStatusCache {
    entries: Arc<Mutex<HashMap<TripId, (StatusSnapshot, Option<DateTime<Utc>>)>>>,
    clock: Arc<dyn Clock>,
    fail_reads: Arc<AtomicBool>,
}

impl MockStatusCache {
    /// Cache on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Cache whose entries expire against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            fail_reads: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Insert a snapshot that never expires on its own.
    pub fn insert_snapshot(&self, trip_id: &TripId, snapshot: StatusSnapshot) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(trip_id.clone(), (snapshot, None));
        }
    }

    /// Make every subsequent read fail with `CacheError`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCache for MockStatusCache {
    async fn get(&self, trip_id: &TripId) -> Result<Option<StatusSnapshot>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RideError::CacheError("Simulated read failure".into()));
        }

        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        let expired = matches!(
            entries.get(trip_id),
            Some((_, Some(expires_at))) if *expires_at <= now
        );
        if expired {
            entries.remove(trip_id);
            return Ok(None);
        }
        Ok(entries.get(trip_id).map(|(snapshot, _)| *snapshot))
    }

    async fn set(&self, trip_id: &TripId, snapshot: StatusSnapshot, ttl: Duration) -> Result<()> {
        let expires_at = self.clock.now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;
        entries.insert(trip_id.clone(), (snapshot, Some(expires_at)));
        Ok(())
    }
}
