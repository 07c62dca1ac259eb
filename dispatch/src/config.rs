//! Dispatch configuration.
//!
//! Values are supplied by the application; defaults suit a sandbox
//! deployment.

use std::time::Duration;

/// Engine-wide timing configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum age at which a cached status is served without a provider call.
    ///
    /// Default: 30 seconds
    pub status_freshness: Duration,

    /// Hard expiry of an idempotency lease. A crashed submission blocks
    /// retries of the same request for at most this long.
    ///
    /// Default: 30 seconds
    pub lock_ttl: Duration,

    /// Upper bound on any single provider call. Elapsed calls are failures.
    ///
    /// Default: 10 seconds
    pub provider_timeout: Duration,
}

impl DispatchConfig {
    /// Create configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status_freshness: Duration::from_secs(30),
            lock_ttl: Duration::from_secs(30),
            provider_timeout: Duration::from_secs(10),
        }
    }

    /// Set the status freshness horizon.
    #[must_use]
    pub const fn with_status_freshness(mut self, freshness: Duration) -> Self {
        self.status_freshness = freshness;
        self
    }

    /// Set the lease expiry.
    #[must_use]
    pub const fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Set the provider call timeout.
    #[must_use]
    pub const fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Creation worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deliveries of one job before a retryable failure is treated as final.
    ///
    /// Default: 3
    pub max_attempts: u32,

    /// Pause after an empty poll or a worker-level error.
    ///
    /// Default: 1 second
    pub idle_backoff: Duration,
}

impl WorkerConfig {
    /// Create configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 3,
            idle_backoff: Duration::from_secs(1),
        }
    }

    /// Set the delivery limit. Values below 1 are treated as 1.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Set the idle backoff.
    #[must_use]
    pub const fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}
