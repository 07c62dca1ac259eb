//! Ride-creation worker.
//!
//! Consumes [`CreateRideJob`]s queued by the NORMAL dispatch path and makes
//! the actual provider call. Completion is communicated only through the
//! durable store: on success the record becomes reachable by both the local
//! request id and the provider trip id.
//!
//! # Delivery
//!
//! - Retryable provider failures are returned to the queue until
//!   `max_attempts` deliveries have been made.
//! - Terminal failures and exhausted attempts mark the record `ERROR`.
//! - Once the provider has accepted, the job is always acknowledged, even if
//!   recording the trip fails, so a ride is never requested twice.

use crate::config::WorkerConfig;
use crate::constants::metrics::WORKER_JOBS;
use crate::environment::Clock;
use crate::error::{RideError, Result};
use crate::providers::{Delivery, JobSource, TripStore, with_timeout};
use crate::registry::ProviderRegistry;
use crate::state::{RideStatus, TripId, TripRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Provider accepted; record now carries the trip id.
    Dispatched {
        /// Provider trip identifier.
        trip_id: TripId,
    },
    /// A previous delivery already dispatched or settled this request.
    Skipped,
    /// Retryable failure; job returned to the queue.
    Retrying {
        /// Attempt that just failed.
        attempt: u32,
    },
    /// Request recorded as `ERROR`.
    Failed,
}

impl JobOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Dispatched { .. } => "dispatched",
            Self::Skipped => "skipped",
            Self::Retrying { .. } => "retrying",
            Self::Failed => "failed",
        }
    }
}

/// Background consumer of the creation queue.
pub struct CreationWorker<J, S> {
    jobs: J,
    trips: S,
    registry: Arc<ProviderRegistry>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
    provider_timeout: Duration,
}

impl<J, S> CreationWorker<J, S>
where
    J: JobSource,
    S: TripStore,
{
    /// Create a worker.
    #[must_use]
    pub fn new(
        jobs: J,
        trips: S,
        registry: Arc<ProviderRegistry>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            trips,
            registry,
            clock,
            config,
            provider_timeout,
        }
    }

    /// Process at most one job. Returns `None` if the queue was empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue or store failed. A store failure after
    /// the provider accepted is reported here after the job was acknowledged.
    pub async fn process_next(&self) -> Result<Option<JobOutcome>> {
        let Some(delivery) = self.jobs.receive().await? else {
            return Ok(None);
        };

        let outcome = self.process(&delivery).await?;
        metrics::counter!(WORKER_JOBS, "outcome" => outcome.label()).increment(1);
        Ok(Some(outcome))
    }

    async fn process(&self, delivery: &Delivery) -> Result<JobOutcome> {
        let job = &delivery.job;
        let local_request_id = job.local_request_id;

        let existing = self.trips.get_by_local_request_id(&local_request_id).await?;
        if let Some(record) = &existing {
            if record.trip_id.is_some() || record.status.is_terminal() {
                tracing::info!(
                    local_request_id = %local_request_id,
                    status = %record.status,
                    "Request already settled, dropping redelivery"
                );
                self.jobs.ack(delivery).await?;
                return Ok(JobOutcome::Skipped);
            }
        }
        let record = existing.unwrap_or_else(|| {
            TripRecord::queued(local_request_id, job.request.provider.clone(), job.enqueued_at)
        });

        let provider = match self.registry.resolve(job.request.provider.as_str()) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::error!(local_request_id = %local_request_id, error = %e, "Job names unknown provider");
                return self.fail(delivery, record).await;
            }
        };

        match with_timeout(self.provider_timeout, provider.request_trip(&job.request)).await {
            Ok(handle) => {
                let accepted = record.accepted(handle.trip_id.clone(), handle.status, self.clock.now());
                let saved = self.trips.save(&accepted).await;
                self.jobs.ack(delivery).await?;

                if let Err(e) = saved {
                    tracing::error!(
                        local_request_id = %local_request_id,
                        trip_id = %handle.trip_id,
                        error = %e,
                        "Provider accepted trip but recording it failed"
                    );
                    return Err(e);
                }

                tracing::info!(
                    local_request_id = %local_request_id,
                    trip_id = %handle.trip_id,
                    attempt = delivery.attempt,
                    "Queued ride dispatched"
                );
                Ok(JobOutcome::Dispatched {
                    trip_id: handle.trip_id,
                })
            }
            Err(e) if e.is_retryable() && delivery.attempt < self.config.max_attempts => {
                tracing::warn!(
                    local_request_id = %local_request_id,
                    attempt = delivery.attempt,
                    error = %e,
                    "Retryable provider failure, requeueing"
                );
                self.jobs.nack(delivery).await?;
                Ok(JobOutcome::Retrying {
                    attempt: delivery.attempt,
                })
            }
            Err(e) => {
                tracing::error!(
                    local_request_id = %local_request_id,
                    attempt = delivery.attempt,
                    error = %e,
                    "Provider rejected queued ride"
                );
                self.fail(delivery, record).await
            }
        }
    }

    async fn fail(&self, delivery: &Delivery, record: TripRecord) -> Result<JobOutcome> {
        let failed = record.with_status(RideStatus::Error, self.clock.now());
        self.trips.save(&failed).await?;
        self.jobs.ack(delivery).await?;
        Ok(JobOutcome::Failed)
    }

    /// Process jobs until `shutdown` turns `true`.
    ///
    /// An in-flight job always runs to completion before the loop checks for
    /// shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Creation worker started");

        while !*shutdown.borrow() {
            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => log_worker_error(&e),
            }

            tokio::select! {
                _ = shutdown.changed() => {}
                () = tokio::time::sleep(self.config.idle_backoff) => {}
            }
        }

        tracing::info!("Creation worker stopped");
    }
}

fn log_worker_error(error: &RideError) {
    tracing::error!(error = %error, "Creation worker iteration failed");
}
