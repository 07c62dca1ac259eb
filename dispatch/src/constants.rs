//! Dispatch constants.
//!
//! Key prefixes, metric names and defaults shared across the engine and its
//! backing stores.

/// Provider identifiers.
pub mod providers {
    /// Uber adapter identity.
    pub const UBER: &str = "UBER";
}

/// Redis key prefixes.
pub mod keys {
    /// Idempotency lock lease: `rideshare:lock:{idempotency_key}`.
    pub const LOCK_PREFIX: &str = "rideshare:lock:";

    /// Cached status snapshot: `rideshare:status:{trip_id}`.
    pub const STATUS_PREFIX: &str = "rideshare:status:";

    /// Trip record by provider trip id: `rideshare:trip:{trip_id}`.
    pub const TRIP_PREFIX: &str = "rideshare:trip:";

    /// Trip record by local request id: `rideshare:trip:local:{id}`.
    pub const TRIP_LOCAL_PREFIX: &str = "rideshare:trip:local:";

    /// Pending creation jobs.
    pub const QUEUE_PENDING: &str = "rideshare:queue:create";

    /// Jobs leased to a worker and not yet acknowledged, scored by the epoch
    /// millisecond at which the lease expires.
    pub const QUEUE_INFLIGHT: &str = "rideshare:queue:create:inflight";
}

/// Metric names.
pub mod metrics {
    /// Create submissions, labelled by `path` (`sync` or `async`).
    pub const CREATE_DISPATCHED: &str = "rideshare.create.dispatched";

    /// Create submissions rejected because the lease was held.
    pub const CREATE_DUPLICATE: &str = "rideshare.create.duplicate";

    /// Status reads, labelled by `outcome` (`record`, `hit`, `miss`).
    pub const STATUS_CACHE: &str = "rideshare.status.cache";

    /// Cancel attempts, labelled by `outcome`.
    pub const CANCEL_OUTCOME: &str = "rideshare.cancel.outcome";

    /// Worker job results, labelled by `outcome`.
    pub const WORKER_JOBS: &str = "rideshare.worker.jobs";
}

/// Client-facing messages.
pub mod messages {
    /// Successful cancel.
    pub const TRIP_CANCELED: &str = "Trip canceled";

    /// Cancel of a trip that was already canceled.
    pub const ALREADY_CANCELED: &str = "Trip was already canceled";
}
