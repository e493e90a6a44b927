//! Bounded FIFO of pending verification jobs
//!
//! Producers never wait: a full queue is reported immediately. Workers
//! share the single receiver, so each job is taken by exactly one worker.
//! Closing is a flag, not a receiver operation, so it never waits behind
//! an idle worker.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::models::VerificationJob;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("verification queue is full")]
    Full,
    #[error("verification queue is closed")]
    Closed,
}

/// Producer side plus the shared consumer handle
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<VerificationJob>,
    rx: Arc<Mutex<mpsc::Receiver<VerificationJob>>>,
    closed: CancellationToken,
    capacity: usize,
}

impl JobQueue {
    /// `capacity` is raised to 1 if zero
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            closed: CancellationToken::new(),
            capacity,
        }
    }

    /// Enqueue without blocking
    pub fn try_enqueue(&self, job: VerificationJob) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Wait for the next job; `None` once the queue is closed and drained
    pub async fn next(&self) -> Option<VerificationJob> {
        let mut rx = self.rx.lock().await;
        if self.closed.is_cancelled() {
            return rx.try_recv().ok();
        }

        tokio::select! {
            biased;
            job = rx.recv() => job,
            _ = self.closed.cancelled() => rx.try_recv().ok(),
        }
    }

    /// Refuse further jobs; queued ones can still be drained
    ///
    /// Workers parked in [`next`](Self::next) wake up and see `None` once
    /// nothing is left.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Jobs waiting to be picked up
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
