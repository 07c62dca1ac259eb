//! Ride-creation work queue.
//!
//! The HTTP-facing engine only enqueues ([`RideQueue`]). Workers consume
//! through [`JobSource`] with at-least-once delivery: a job stays owned by
//! the queue until it is acknowledged, and a negative acknowledgement puts it
//! back for another attempt.

use crate::error::Result;
use crate::state::CreateRideJob;

/// Producer side of the creation queue.
pub trait RideQueue: Send + Sync {
    /// Enqueue a creation job.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if the job could not be accepted.
    fn enqueue(&self, job: CreateRideJob) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A job handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The job.
    pub job: CreateRideJob,

    /// 1 on first delivery, incremented on each redelivery.
    pub attempt: u32,

    /// Backend-specific handle used to acknowledge this delivery.
    pub receipt: String,
}

/// Consumer side of the creation queue.
pub trait JobSource: Send + Sync {
    /// Wait briefly for the next job. `None` means nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if the queue is unreachable.
    fn receive(&self) -> impl std::future::Future<Output = Result<Option<Delivery>>> + Send;

    /// Mark a delivery as done. It will not be delivered again.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if the acknowledgement fails.
    fn ack(&self, delivery: &Delivery) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Return a delivery to the queue with its attempt count incremented.
    ///
    /// # Errors
    ///
    /// Returns `RideError::QueueError` if the job could not be requeued.
    fn nack(&self, delivery: &Delivery) -> impl std::future::Future<Output = Result<()>> + Send;
}
