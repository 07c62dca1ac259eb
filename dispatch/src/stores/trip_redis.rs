//! Redis-based trip record store.
//!
//! # Architecture
//!
//! Each record is stored as JSON under every id it carries:
//!
//! - `rideshare:trip:{trip_id}` once the provider has accepted
//! - `rideshare:trip:local:{local_request_id}` for queued submissions
//!
//! Both copies are written in one `MULTI` transaction, and status updates
//! rewrite both copies inside a Lua script, so the two keys never disagree.
//! Records have no expiry.

use crate::constants::keys::{TRIP_LOCAL_PREFIX, TRIP_PREFIX};
use crate::error::{RideError, Result};
use crate::providers::TripStore;
use crate::state::{LocalRequestId, RideStatus, TripId, TripRecord};
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Moves the trip-id copy to `ARGV[1]` unless its stored status is terminal,
/// and mirrors the result onto the local-id copy when the record has one.
///
/// A terminal status only accepts itself or `ERROR -> CANCELED`. Returns
/// the status stored afterwards, or nil when the key is missing.
const UPDATE_STATUS_SCRIPT: &str = r"
    local raw = redis.call('GET', KEYS[1])
    if not raw then
        return false
    end
    local record = cjson.decode(raw)
    local current = record['status']
    local wanted = ARGV[1]
    if current == wanted then
        return current
    end
    local terminal = current == 'COMPLETED' or current == 'CANCELED' or current == 'ERROR'
    if terminal and not (current == 'ERROR' and wanted == 'CANCELED') then
        return current
    end
    record['status'] = wanted
    record['updatedAt'] = ARGV[2]
    local encoded = cjson.encode(record)
    redis.call('SET', KEYS[1], encoded)
    local localId = record['localRequestId']
    if type(localId) == 'string' then
        redis.call('SET', ARGV[3] .. localId, encoded)
    end
    return wanted
";

/// Writes `ARGV[1]` under every key only if none of them exists yet.
const INSERT_NEW_SCRIPT: &str = r"
    for _, key in ipairs(KEYS) do
        if redis.call('EXISTS', key) == 1 then
            return 0
        end
    end
    for _, key in ipairs(KEYS) do
        redis.call('SET', key, ARGV[1])
    end
    return 1
";

/// Redis trip store.
#[derive(Clone)]
pub struct RedisTripStore {
    conn_manager: ConnectionManager,
}

impl RedisTripStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RideError::DatabaseError` if the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RideError::DatabaseError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            RideError::DatabaseError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Build from an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn trip_key(trip_id: &TripId) -> String {
        format!("{TRIP_PREFIX}{trip_id}")
    }

    fn local_key(local_request_id: &LocalRequestId) -> String {
        format!("{TRIP_LOCAL_PREFIX}{local_request_id}")
    }

    async fn load(&self, key: String) -> Result<Option<TripRecord>> {
        let mut conn = self.conn_manager.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to read trip record: {e}")))?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| {
                RideError::SerializationError(format!("Failed to decode trip record {key}: {e}"))
            })
        })
        .transpose()
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|e| RideError::SerializationError(format!("Failed to encode trip record: {e}")))
    }
}

impl TripStore for RedisTripStore {
    async fn get_by_trip_id(&self, trip_id: &TripId) -> Result<Option<TripRecord>> {
        self.load(Self::trip_key(trip_id)).await
    }

    async fn get_by_local_request_id(
        &self,
        local_request_id: &LocalRequestId,
    ) -> Result<Option<TripRecord>> {
        self.load(Self::local_key(local_request_id)).await
    }

    async fn save(&self, record: &TripRecord) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let payload = Self::encode(record)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(trip_id) = &record.trip_id {
            pipe.set(Self::trip_key(trip_id), &payload).ignore();
        }
        if let Some(local_request_id) = &record.local_request_id {
            pipe.set(Self::local_key(local_request_id), &payload).ignore();
        }

        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to save trip record: {e}")))?;

        tracing::debug!(
            trip_id = ?record.trip_id,
            local_request_id = ?record.local_request_id,
            status = %record.status,
            "Trip record saved"
        );
        Ok(())
    }

    async fn insert_new(&self, record: &TripRecord) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let payload = Self::encode(record)?;

        let script = redis::Script::new(INSERT_NEW_SCRIPT);
        let mut invocation = script.prepare_invoke();
        if let Some(trip_id) = &record.trip_id {
            invocation.key(Self::trip_key(trip_id));
        }
        if let Some(local_request_id) = &record.local_request_id {
            invocation.key(Self::local_key(local_request_id));
        }

        let inserted: i64 = invocation
            .arg(&payload)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to insert trip record: {e}")))?;

        Ok(inserted == 1)
    }

    async fn update_status(
        &self,
        trip_id: &TripId,
        status: RideStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<RideStatus>> {
        let mut conn = self.conn_manager.clone();

        // Same string forms the serde encoding of `TripRecord` uses.
        let status_json = serde_json::to_value(status)
            .map_err(|e| RideError::SerializationError(format!("Failed to encode status: {e}")))?;
        let at_json = serde_json::to_value(at)
            .map_err(|e| RideError::SerializationError(format!("Failed to encode timestamp: {e}")))?;

        let stored: Option<String> = redis::Script::new(UPDATE_STATUS_SCRIPT)
            .key(Self::trip_key(trip_id))
            .arg(status_json.as_str().unwrap_or_else(|| status.as_str()))
            .arg(at_json.as_str().unwrap_or_default())
            .arg(TRIP_LOCAL_PREFIX)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::DatabaseError(format!("Failed to update trip status: {e}")))?;

        stored
            .map(|raw| {
                RideStatus::parse(&raw).ok_or_else(|| {
                    RideError::SerializationError(format!("Unknown stored status: {raw}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::ProviderId;

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_trip_record_reachable_by_both_ids() {
        let store = RedisTripStore::new("redis://127.0.0.1:6379").await.unwrap();
        let now = Utc::now();
        let local = LocalRequestId::generate();
        let trip_id = TripId::new(format!("test-{}", uuid::Uuid::new_v4()));

        let queued = TripRecord::queued(local, ProviderId::new("uber"), now);
        store.save(&queued).await.unwrap();
        assert!(store.get_by_trip_id(&trip_id).await.unwrap().is_none());

        let accepted = queued.accepted(trip_id.clone(), RideStatus::Pending, now);
        store.save(&accepted).await.unwrap();
        assert_eq!(store.get_by_trip_id(&trip_id).await.unwrap(), Some(accepted.clone()));
        assert_eq!(store.get_by_local_request_id(&local).await.unwrap(), Some(accepted));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_update_status_rewrites_both_copies() {
        let store = RedisTripStore::new("redis://127.0.0.1:6379").await.unwrap();
        let now = Utc::now();
        let local = LocalRequestId::generate();
        let trip_id = TripId::new(format!("test-{}", uuid::Uuid::new_v4()));

        let record = TripRecord::queued(local, ProviderId::new("uber"), now).accepted(
            trip_id.clone(),
            RideStatus::Pending,
            now,
        );
        store.save(&record).await.unwrap();

        assert_eq!(
            store.update_status(&trip_id, RideStatus::Canceled, now).await.unwrap(),
            Some(RideStatus::Canceled)
        );
        let by_trip = store.get_by_trip_id(&trip_id).await.unwrap().unwrap();
        let by_local = store.get_by_local_request_id(&local).await.unwrap().unwrap();
        assert_eq!(by_trip.status, RideStatus::Canceled);
        assert_eq!(by_trip, by_local);

        let missing = TripId::new("does-not-exist");
        assert_eq!(store.update_status(&missing, RideStatus::Canceled, now).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_update_status_keeps_terminal_status() {
        let store = RedisTripStore::new("redis://127.0.0.1:6379").await.unwrap();
        let now = Utc::now();
        let trip_id = TripId::new(format!("test-{}", uuid::Uuid::new_v4()));
        let canceled =
            TripRecord::dispatched(trip_id.clone(), ProviderId::new("uber"), RideStatus::Canceled, now);
        assert!(store.insert_new(&canceled).await.unwrap());

        let stored = store.update_status(&trip_id, RideStatus::InTransit, now).await.unwrap();
        assert_eq!(stored, Some(RideStatus::Canceled));

        let stale = canceled.clone().with_status(RideStatus::InTransit, now);
        assert!(!store.insert_new(&stale).await.unwrap());
        assert_eq!(store.get_by_trip_id(&trip_id).await.unwrap(), Some(canceled));
    }
}
