//! PostgreSQL trip record store.
//!
//! # Architecture
//!
//! One row per ride in `trip_records`. Rows are keyed by a surrogate
//! `record_key` chosen from the ids the record carried when it was first
//! written:
//!
//! - `local:{local_request_id}` for queued submissions
//! - `trip:{trip_id}` for trips dispatched inline
//!
//! `save` is an upsert on that key, so attaching a trip id to a queued
//! record updates the same row. A partial unique index on `trip_id` keeps
//! trip-id lookups unambiguous.
//!
//! # Example
//!
//! ```no_run
//! use rideshare_dispatch::stores::PostgresTripStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/rideshare").await?;
//! let store = PostgresTripStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{RideError, Result};
use crate::providers::TripStore;
use crate::state::{LocalRequestId, ProviderId, RideStatus, TripId, TripRecord};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT trip_id, local_request_id, provider, status, created_at, updated_at FROM trip_records";

/// `PostgreSQL` trip store.
#[derive(Clone)]
pub struct PostgresTripStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresTripStore {
    /// Create a new `PostgreSQL` trip store.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    fn record_key(record: &TripRecord) -> Result<String> {
        match (&record.local_request_id, &record.trip_id) {
            (Some(local), _) => Ok(format!("local:{local}")),
            (None, Some(trip_id)) => Ok(format!("trip:{trip_id}")),
            (None, None) => Err(RideError::InternalError(
                "Trip record carries neither a trip id nor a local request id".into(),
            )),
        }
    }

    fn from_row(row: &PgRow) -> Result<TripRecord> {
        let decode = |e: sqlx::Error| RideError::DatabaseError(format!("Failed to decode row: {e}"));

        let trip_id: Option<String> = row.try_get("trip_id").map_err(decode)?;
        let local_request_id: Option<Uuid> = row.try_get("local_request_id").map_err(decode)?;
        let provider: String = row.try_get("provider").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;

        let status = RideStatus::parse(&status).ok_or_else(|| {
            RideError::DatabaseError(format!("Unknown status in trip_records: {status}"))
        })?;

        Ok(TripRecord {
            trip_id: trip_id.map(TripId::new),
            local_request_id: local_request_id.map(LocalRequestId::from),
            provider: ProviderId::new(provider),
            status,
            created_at: row.try_get("created_at").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
        })
    }
}

impl TripStore for PostgresTripStore {
    async fn get_by_trip_id(&self, trip_id: &TripId) -> Result<Option<TripRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE trip_id = $1"))
            .bind(trip_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to get trip record: {e}")))?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn get_by_local_request_id(
        &self,
        local_request_id: &LocalRequestId,
    ) -> Result<Option<TripRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE local_request_id = $1"))
            .bind(local_request_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to get trip record: {e}")))?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn save(&self, record: &TripRecord) -> Result<()> {
        let record_key = Self::record_key(record)?;

        sqlx::query(
            r"
            INSERT INTO trip_records
                (record_key, trip_id, local_request_id, provider, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (record_key) DO UPDATE SET
                trip_id = EXCLUDED.trip_id,
                provider = EXCLUDED.provider,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(&record_key)
        .bind(record.trip_id.as_ref().map(TripId::as_str))
        .bind(record.local_request_id.as_ref().map(LocalRequestId::as_uuid))
        .bind(record.provider.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RideError::DatabaseError(format!("Failed to save trip record: {e}")))?;

        tracing::debug!(record_key = %record_key, status = %record.status, "Trip record saved");
        Ok(())
    }

    async fn insert_new(&self, record: &TripRecord) -> Result<bool> {
        let record_key = Self::record_key(record)?;

        // Conflicts on the record key or the trip id index both skip the row.
        let result = sqlx::query(
            r"
            INSERT INTO trip_records
                (record_key, trip_id, local_request_id, provider, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(&record_key)
        .bind(record.trip_id.as_ref().map(TripId::as_str))
        .bind(record.local_request_id.as_ref().map(LocalRequestId::as_uuid))
        .bind(record.provider.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RideError::DatabaseError(format!("Failed to insert trip record: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        trip_id: &TripId,
        status: RideStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<RideStatus>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to start transaction: {e}")))?;

        // The row lock holds concurrent writers off until commit.
        let row = sqlx::query("SELECT status FROM trip_records WHERE trip_id = $1 FOR UPDATE")
            .bind(trip_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to lock trip record: {e}")))?;

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return Ok(None);
        };

        let current: String = row
            .try_get("status")
            .map_err(|e| RideError::DatabaseError(format!("Failed to decode row: {e}")))?;
        let current = RideStatus::parse(&current).ok_or_else(|| {
            RideError::DatabaseError(format!("Unknown status in trip_records: {current}"))
        })?;

        if current == status || !current.can_transition_to(status) {
            let _ = tx.rollback().await;
            return Ok(Some(current));
        }

        sqlx::query("UPDATE trip_records SET status = $2, updated_at = $3 WHERE trip_id = $1")
            .bind(trip_id.as_str())
            .bind(status.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to update trip status: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to commit transaction: {e}")))?;

        Ok(Some(status))
    }
}
