//! Mock ride-creation queue for testing.

use crate::error::{RideError, Result};
use crate::providers::{Delivery, JobSource, RideQueue};
use crate::state::CreateRideJob;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory FIFO implementing both the producer and consumer sides.
///
/// `receive` never blocks: an empty queue yields `None` immediately.
#[derive(Debug, Clone, Default)]
pub struct MockRideQueue {
    pending: Arc<Mutex<VecDeque<(CreateRideJob, u32)>>>,
    acked: Arc<AtomicUsize>,
    nacked: Arc<AtomicUsize>,
    fail_enqueue: Arc<AtomicBool>,
}

impl MockRideQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent enqueue fail with `QueueError`.
    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    /// Jobs waiting for delivery.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().map_or(0, |p| p.len())
    }

    /// Whether no job is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs currently waiting, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<CreateRideJob> {
        self.pending
            .lock()
            .map(|p| p.iter().map(|(job, _)| job.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of acknowledged deliveries.
    #[must_use]
    pub fn acked(&self) -> usize {
        self.acked.load(Ordering::SeqCst)
    }

    /// Number of negatively acknowledged deliveries.
    #[must_use]
    pub fn nacked(&self) -> usize {
        self.nacked.load(Ordering::SeqCst)
    }

    fn push(&self, job: CreateRideJob, attempt: u32) -> Result<()> {
        self.pending
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?
            .push_back((job, attempt));
        Ok(())
    }
}

impl RideQueue for MockRideQueue {
    async fn enqueue(&self, job: CreateRideJob) -> Result<()> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(RideError::QueueError("Simulated enqueue failure".into()));
        }
        self.push(job, 1)
    }
}

impl JobSource for MockRideQueue {
    async fn receive(&self) -> Result<Option<Delivery>> {
        let next = self
            .pending
            .lock()
            .map_err(|_| RideError::InternalError("Mutex lock failed".into()))?
            .pop_front();

        Ok(next.map(|(job, attempt)| Delivery {
            receipt: job.local_request_id.to_string(),
            job,
            attempt,
        }))
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<()> {
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<()> {
        self.nacked.fetch_add(1, Ordering::SeqCst);
        self.push(delivery.job.clone(), delivery.attempt + 1)
    }
}
