//! Redis-based status cache.
//!
//! Snapshots are stored as JSON under `rideshare:status:{trip_id}` with a
//! `SETEX` expiry. Redis expiry is second-granular, so sub-second TTLs round
//! up to one second; readers still apply the freshness horizon themselves.

use crate::constants::keys::STATUS_PREFIX;
use crate::error::{RideError, Result};
use crate::providers::StatusCache;
use crate::state::{StatusSnapshot, TripId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis status cache.
#[derive(Clone)]
pub struct RedisStatusCache {
    conn_manager: ConnectionManager,
}

impl RedisStatusCache {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RideError::CacheError` if the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RideError::CacheError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            RideError::CacheError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Build from an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn status_key(trip_id: &TripId) -> String {
        format!("{STATUS_PREFIX}{trip_id}")
    }
}

impl StatusCache for RedisStatusCache {
    async fn get(&self, trip_id: &TripId) -> Result<Option<StatusSnapshot>> {
        let mut conn = self.conn_manager.clone();

        let raw: Option<String> = conn
            .get(Self::status_key(trip_id))
            .await
            .map_err(|e| RideError::CacheError(format!("Failed to read status: {e}")))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                // Unreadable entries are treated as a miss and overwritten
                // by the next refresh.
                tracing::warn!(trip_id = %trip_id, error = %e, "Discarding unreadable status snapshot");
                Ok(None)
            }
        }
    }

    async fn set(&self, trip_id: &TripId, snapshot: StatusSnapshot, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let payload = serde_json::to_string(&snapshot)
            .map_err(|e| RideError::SerializationError(format!("Failed to encode status: {e}")))?;
        let secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(Self::status_key(trip_id), payload, secs)
            .await
            .map_err(|e| RideError::CacheError(format!("Failed to write status: {e}")))?;

        Ok(())
    }
}
