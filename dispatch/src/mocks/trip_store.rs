//! Mock trip store for testing.

use crate::error::{RideError, Result};
use crate::providers::TripStore;
use crate::state::{LocalRequestId, RideStatus, TripId, TripRecord};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory trip store.
///
/// Records live in one list; lookups scan it. Writes can be made to fail to
/// exercise degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MockTripStore {
    records: Arc<Mutex<Vec<TripRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockTripStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `DatabaseError`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all records.
    #[must_use]
    pub fn records(&self) -> Vec<TripRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RideError::DatabaseError("Simulated write failure".into()));
        }
        Ok(())
    }

    fn find<F>(&self, predicate: F) -> Result<Option<TripRecord>>
    where
        F: Fn(&TripRecord) -> bool,
    {
        let records = self
            .records
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;
        Ok(records.iter().find(|r| predicate(r)).cloned())
    }
}

impl TripStore for MockTripStore {
    async fn get_by_trip_id(&self, trip_id: &TripId) -> Result<Option<TripRecord>> {
        self.find(|r| r.trip_id.as_ref() == Some(trip_id))
    }

    async fn get_by_local_request_id(
        &self,
        local_request_id: &LocalRequestId,
    ) -> Result<Option<TripRecord>> {
        self.find(|r| r.local_request_id.as_ref() == Some(local_request_id))
    }

    async fn save(&self, record: &TripRecord) -> Result<()> {
        self.check_writable()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        let existing = records.iter().position(|r| match &record.local_request_id {
            Some(local) => r.local_request_id.as_ref() == Some(local),
            None => r.trip_id.is_some() && r.trip_id == record.trip_id,
        });
        match existing {
            Some(index) => records[index] = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn insert_new(&self, record: &TripRecord) -> Result<bool> {
        self.check_writable()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        let taken = records.iter().any(|r| {
            (r.trip_id.is_some() && r.trip_id == record.trip_id)
                || (r.local_request_id.is_some() && r.local_request_id == record.local_request_id)
        });
        if !taken {
            records.push(record.clone());
        }
        Ok(!taken)
    }

    async fn update_status(
        &self,
        trip_id: &TripId,
        status: RideStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<RideStatus>> {
        self.check_writable()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?;

        Ok(records
            .iter_mut()
            .find(|r| r.trip_id.as_ref() == Some(trip_id))
            .map(|record| {
                if record.status != status && record.status.can_transition_to(status) {
                    record.status = status;
                    record.updated_at = at;
                }
                record.status
            }))
    }
}
