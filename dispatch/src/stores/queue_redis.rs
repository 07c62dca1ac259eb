//! Redis-backed reliable work queue.
//!
//! # Architecture
//!
//! - `rideshare:queue:create` - list of pending envelopes, pushed on the left
//! - `rideshare:queue:create:inflight` - sorted set of leased envelopes,
//!   scored by lease expiry in epoch milliseconds
//!
//! `receive` pops the oldest pending envelope and leases it for the
//! visibility timeout in one Lua script, so a worker crash leaves the job in
//! the in-flight set rather than losing it. The receipt is
//! `{lease_expiry}:{payload}`. `ack` removes the lease; `nack` swaps it for
//! an envelope with the next attempt number, atomically. Both are no-ops
//! once the lease has expired and been handed to someone else.
//!
//! Only expired leases are ever returned to the pending list. Every
//! `receive` reclaims them first, and [`RedisRideQueue::reclaim_expired`]
//! does the same on demand (at startup, for instance). A job another live
//! replica is still working on keeps its lease, so restarting one replica
//! never hands that job out twice. The visibility timeout must exceed the
//! longest a worker spends on one job.
//!
//! `receive` does not block inside Redis: a blocking pop would stall the
//! shared multiplexed connection. When the queue is empty it sleeps for the
//! poll interval and returns `None`.

use crate::constants::keys::{QUEUE_INFLIGHT, QUEUE_PENDING};
use crate::error::{RideError, Result};
use crate::providers::{Delivery, JobSource, RideQueue};
use crate::state::CreateRideJob;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Moves expired leases from `KEYS[1]` (in-flight) to the consuming end of
/// `KEYS[2]` (pending). `ARGV[1]` is now in epoch milliseconds. Returns the
/// number of envelopes moved.
const RECLAIM_SCRIPT: &str = r"
    local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
    for _, payload in ipairs(expired) do
        redis.call('ZREM', KEYS[1], payload)
        redis.call('RPUSH', KEYS[2], payload)
    end
    return #expired
";

/// Reclaims expired leases, then pops the oldest pending envelope from
/// `KEYS[2]` and leases it in `KEYS[1]` until `ARGV[2]`.
const RECEIVE_SCRIPT: &str = r"
    local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
    for _, payload in ipairs(expired) do
        redis.call('ZREM', KEYS[1], payload)
        redis.call('RPUSH', KEYS[2], payload)
    end
    local payload = redis.call('RPOP', KEYS[2])
    if not payload then
        return false
    end
    redis.call('ZADD', KEYS[1], ARGV[2], payload)
    return payload
";

/// Releases lease `ARGV[1]` if it still expires at `ARGV[2]`, which only
/// the delivery that created it knows.
const ACK_SCRIPT: &str = r"
    local score = redis.call('ZSCORE', KEYS[1], ARGV[1])
    if score and tonumber(score) == tonumber(ARGV[2]) then
        redis.call('ZREM', KEYS[1], ARGV[1])
        return 1
    end
    return 0
";

/// Like [`ACK_SCRIPT`], and pushes retry envelope `ARGV[3]` when the lease
/// was released.
const NACK_SCRIPT: &str = r"
    local score = redis.call('ZSCORE', KEYS[1], ARGV[1])
    if score and tonumber(score) == tonumber(ARGV[2]) then
        redis.call('ZREM', KEYS[1], ARGV[1])
        redis.call('LPUSH', KEYS[2], ARGV[3])
        return 1
    end
    return 0
";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    job: CreateRideJob,
    attempt: u32,
}

/// Redis queue implementing both sides of the creation queue.
#[derive(Clone)]
pub struct RedisRideQueue {
    conn_manager: ConnectionManager,
    poll_interval: Duration,
    visibility_timeout: Duration,
}

impl RedisRideQueue {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RideError::QueueError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            RideError::QueueError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self::from_manager(conn_manager))
    }

    /// Build from an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            poll_interval: DEFAULT_POLL_INTERVAL,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    /// How long `receive` waits when the queue is empty.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// How long a received job stays leased before it may be handed out again.
    #[must_use]
    pub const fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// Return every expired lease to the pending list.
    ///
    /// Leases that have not expired are left alone, so this is safe to call
    /// while other replicas are working. Returns the number of envelopes
    /// moved.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if Redis is unreachable.
    pub async fn reclaim_expired(&self) -> Result<usize> {
        let mut conn = self.conn_manager.clone();

        let moved: usize = redis::Script::new(RECLAIM_SCRIPT)
            .key(QUEUE_INFLIGHT)
            .key(QUEUE_PENDING)
            .arg(epoch_millis(Utc::now()))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::QueueError(format!("Failed to reclaim jobs: {e}")))?;

        if moved > 0 {
            tracing::info!(count = moved, "Reclaimed expired creation job leases");
        }
        Ok(moved)
    }

    fn encode(job: &CreateRideJob, attempt: u32) -> Result<String> {
        serde_json::to_string(&Envelope {
            job: job.clone(),
            attempt,
        })
        .map_err(|e| RideError::SerializationError(format!("Failed to encode job: {e}")))
    }
}

/// Lease scores are epoch milliseconds from the receiving replica's clock.
fn epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn lease_deadline(now: DateTime<Utc>, visibility_timeout: Duration) -> i64 {
    let timeout = i64::try_from(visibility_timeout.as_millis()).unwrap_or(i64::MAX);
    epoch_millis(now).saturating_add(timeout)
}

fn receipt(deadline: i64, payload: &str) -> String {
    format!("{deadline}:{payload}")
}

/// Split a receipt into lease expiry and payload.
fn parse_receipt(receipt: &str) -> Result<(i64, &str)> {
    receipt
        .split_once(':')
        .and_then(|(deadline, payload)| deadline.parse().ok().map(|d| (d, payload)))
        .ok_or_else(|| RideError::QueueError("Malformed delivery receipt".into()))
}

impl RideQueue for RedisRideQueue {
    async fn enqueue(&self, job: CreateRideJob) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let payload = Self::encode(&job, 1)?;

        let _: () = conn
            .lpush(QUEUE_PENDING, payload)
            .await
            .map_err(|e| RideError::QueueError(format!("Failed to enqueue job: {e}")))?;

        tracing::debug!(local_request_id = %job.local_request_id, "Creation job enqueued");
        Ok(())
    }
}

impl JobSource for RedisRideQueue {
    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut conn = self.conn_manager.clone();
        let now = Utc::now();
        let deadline = lease_deadline(now, self.visibility_timeout);

        let payload: Option<String> = redis::Script::new(RECEIVE_SCRIPT)
            .key(QUEUE_INFLIGHT)
            .key(QUEUE_PENDING)
            .arg(epoch_millis(now))
            .arg(deadline)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::QueueError(format!("Failed to receive job: {e}")))?;

        let Some(payload) = payload else {
            tokio::time::sleep(self.poll_interval).await;
            return Ok(None);
        };

        match serde_json::from_str::<Envelope>(&payload) {
            Ok(envelope) => Ok(Some(Delivery {
                job: envelope.job,
                attempt: envelope.attempt,
                receipt: receipt(deadline, &payload),
            })),
            Err(e) => {
                // A poison envelope would be redelivered forever; drop it.
                let _: () = conn
                    .zrem(QUEUE_INFLIGHT, &payload)
                    .await
                    .map_err(|err| RideError::QueueError(format!("Failed to drop bad job: {err}")))?;
                Err(RideError::SerializationError(format!(
                    "Discarded undecodable job: {e}"
                )))
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let (deadline, payload) = parse_receipt(&delivery.receipt)?;

        let released: i64 = redis::Script::new(ACK_SCRIPT)
            .key(QUEUE_INFLIGHT)
            .arg(payload)
            .arg(deadline)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::QueueError(format!("Failed to ack job: {e}")))?;

        if released == 0 {
            tracing::warn!(
                local_request_id = %delivery.job.local_request_id,
                "Lease expired before ack; job may run again"
            );
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let (deadline, payload) = parse_receipt(&delivery.receipt)?;
        let retry = Self::encode(&delivery.job, delivery.attempt + 1)?;

        let released: i64 = redis::Script::new(NACK_SCRIPT)
            .key(QUEUE_INFLIGHT)
            .key(QUEUE_PENDING)
            .arg(payload)
            .arg(deadline)
            .arg(retry)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RideError::QueueError(format!("Failed to nack job: {e}")))?;

        if released == 0 {
            tracing::warn!(
                local_request_id = %delivery.job.local_request_id,
                "Lease expired before nack; job was already reclaimed"
            );
        }
        Ok(())
    }
}
