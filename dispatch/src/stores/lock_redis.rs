//! Redis-based idempotency lock service.
//!
//! # Architecture
//!
//! - **Key**: `rideshare:lock:{idempotency_key}` → random lease token
//! - **Acquire**: `SET key token NX PX ttl_ms`; a nil reply means held
//! - **Release**: Lua compare-and-delete, so only the token holder can free
//!   the key
//!
//! Expiry is enforced by Redis itself; a crashed holder never blocks a key
//! past its TTL.
//!
//! # Example
//!
//! ```no_run
//! use rideshare_dispatch::stores::RedisLockService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locks = RedisLockService::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::keys::LOCK_PREFIX;
use crate::error::{RideError, Result};
use crate::providers::{Lease, LockService};
use redis::aio::ConnectionManager;
use redis::Client;
use std::time::Duration;
use uuid::Uuid;

const RELEASE_SCRIPT: &str = r"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
";

/// Redis lease table.
#[derive(Clone)]
pub struct RedisLockService {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisLockService {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RideError::LockError` if the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RideError::LockError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            RideError::LockError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Build from an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn lock_key(key: &str) -> String {
        format!("{LOCK_PREFIX}{key}")
    }
}

impl LockService for RedisLockService {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<Lease>> {
        let mut conn = self.conn_manager.clone();
        let token = Uuid::new_v4().to_string();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::lock_key(key))
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| RideError::LockError(format!("Failed to acquire lease: {e}")))?;

        if reply.is_none() {
            tracing::debug!(key = %key, "Lease already held");
            return Ok(None);
        }

        tracing::debug!(key = %key, ttl_ms = ttl_ms, "Lease acquired");
        Ok(Some(Lease {
            key: key.to_string(),
            token,
            ttl,
        }))
    }

    async fn release(&self, lease: &Lease) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(Self::lock_key(&lease.key))
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::LockError(format!("Failed to release lease: {e}")))?;

        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_redis_lease_is_exclusive() {
        let locks = RedisLockService::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("test-{}", Uuid::new_v4());

        let lease = locks.acquire(&key, Duration::from_secs(5)).await.unwrap().unwrap();
        assert!(locks.acquire(&key, Duration::from_secs(5)).await.unwrap().is_none());

        assert!(locks.release(&lease).await.unwrap());
        assert!(locks.acquire(&key, Duration::from_secs(5)).await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_redis_stale_holder_cannot_release() {
        let locks = RedisLockService::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("test-{}", Uuid::new_v4());

        let stale = locks.acquire(&key, Duration::from_millis(50)).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fresh = locks.acquire(&key, Duration::from_secs(5)).await.unwrap().unwrap();

        assert!(!locks.release(&stale).await.unwrap());
        assert!(locks.release(&fresh).await.unwrap());
    }
}
