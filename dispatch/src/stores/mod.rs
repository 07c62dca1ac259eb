//! Storage implementations for the dispatch engine.
//!
//! - **Lock Service** (Redis) - `SET NX PX` leases with token-checked release
//! - **Status Cache** (Redis) - JSON snapshots with `SETEX` expiry
//! - **Ride Queue** (Redis) - reliable list queue with visibility-timeout leases
//! - **Trip Store** (Redis) - JSON records reachable by trip id and local id
//! - **Ride Queue** (in-process) - bounded `tokio::mpsc` channel
//! - **Trip Store** (PostgreSQL, feature `postgres`) - durable trip records

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod lock_redis;
pub mod queue_channel;
pub mod queue_redis;
pub mod status_cache_redis;
pub mod trip_redis;

// Re-exports
#[cfg(feature = "postgres")]
pub use postgres::PostgresTripStore;
pub use lock_redis::RedisLockService;
pub use queue_channel::ChannelRideQueue;
pub use queue_redis::RedisRideQueue;
pub use status_cache_redis::RedisStatusCache;
pub use trip_redis::RedisTripStore;
