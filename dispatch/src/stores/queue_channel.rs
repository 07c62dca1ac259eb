//! In-process creation queue over a bounded `tokio::mpsc` channel.
//!
//! For single-node deployments without Redis. Jobs live only in memory: a
//! process restart loses anything not yet dispatched, and there is no
//! processing list, so `ack` is a no-op.

use crate::error::{RideError, Result};
use crate::providers::{Delivery, JobSource, RideQueue};
use crate::state::CreateRideJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Channel-backed queue. Clones share the channel.
#[derive(Clone)]
pub struct ChannelRideQueue {
    sender: mpsc::Sender<(CreateRideJob, u32)>,
    receiver: Arc<Mutex<mpsc::Receiver<(CreateRideJob, u32)>>>,
    poll_timeout: Duration,
}

impl ChannelRideQueue {
    /// Queue holding at most `capacity` jobs. Enqueue fails when full.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// How long `receive` waits for a job.
    #[must_use]
    pub const fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    fn push(&self, job: CreateRideJob, attempt: u32) -> Result<()> {
        self.sender.try_send((job, attempt)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RideError::QueueError("Queue is full".into()),
            mpsc::error::TrySendError::Closed(_) => RideError::QueueError("Queue is closed".into()),
        })
    }
}

impl RideQueue for ChannelRideQueue {
    async fn enqueue(&self, job: CreateRideJob) -> Result<()> {
        self.push(job, 1)
    }
}

impl JobSource for ChannelRideQueue {
    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut receiver = self.receiver.lock().await;

        match tokio::time::timeout(self.poll_timeout, receiver.recv()).await {
            Ok(Some((job, attempt))) => Ok(Some(Delivery {
                receipt: job.local_request_id.to_string(),
                job,
                attempt,
            })),
            Ok(None) => Err(RideError::QueueError("Queue is closed".into())),
            Err(_) => Ok(None),
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<()> {
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<()> {
        self.push(delivery.job.clone(), delivery.attempt + 1)
    }
}
