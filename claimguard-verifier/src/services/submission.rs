//! Inbound submission: admission, then enqueue
//!
//! `submit` returns as soon as the job is queued or refused; processing
//! happens later on a worker.

use std::sync::Arc;

use chrono::Utc;
use claimguard_common::events::{EventBus, VerifierEvent};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::VerificationJob;
use crate::services::admission_controller::{AdmissionController, Rejection};
use crate::workers::job_queue::{JobQueue, QueueError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0}")]
    AdmissionRejected(Rejection),
    #[error("The verification queue is full. Please try again later.")]
    QueueFull,
    #[error("The verifier is shutting down.")]
    QueueClosed,
}

impl From<QueueError> for SubmitError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full => SubmitError::QueueFull,
            QueueError::Closed => SubmitError::QueueClosed,
        }
    }
}

/// Caller-facing answer to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub accepted: bool,
    /// Empty when accepted
    pub reason: String,
    pub job_id: Option<Uuid>,
}

impl From<&Result<Uuid, SubmitError>> for SubmitOutcome {
    fn from(result: &Result<Uuid, SubmitError>) -> Self {
        match result {
            Ok(job_id) => Self {
                accepted: true,
                reason: String::new(),
                job_id: Some(*job_id),
            },
            Err(err) => Self {
                accepted: false,
                reason: err.to_string(),
                job_id: None,
            },
        }
    }
}

/// Entry point shared by every trigger (HTTP, chat adapters, tests)
#[derive(Debug, Clone)]
pub struct Submitter {
    admission: Arc<AdmissionController>,
    queue: JobQueue,
    event_bus: EventBus,
}

impl Submitter {
    pub fn new(admission: Arc<AdmissionController>, queue: JobQueue, event_bus: EventBus) -> Self {
        Self {
            admission,
            queue,
            event_bus,
        }
    }

    /// Admit and enqueue a job, returning its id
    ///
    /// Admission commits before enqueue, so a job refused by a full queue
    /// still counts against the requester.
    pub fn submit(&self, job: VerificationJob) -> Result<Uuid, SubmitError> {
        let admission = self.admission.check(job.requester_id(), job.group_id());
        if let Some(rejection) = admission.rejection {
            info!(
                requester_id = job.requester_id(),
                group_id = ?job.group_id(),
                reason = %rejection,
                "Verification request rejected by admission control"
            );
            return Err(SubmitError::AdmissionRejected(rejection));
        }

        let job_id = job.job_id();
        let requester_id = job.requester_id();
        let channel_id = job.channel_id();
        let claim_len = job.claim().chars().count();

        self.queue.try_enqueue(job).map_err(|err| {
            info!(requester_id, error = %err, "Verification request not queued");
            SubmitError::from(err)
        })?;

        debug!(
            %job_id,
            requester_id,
            claim_len,
            queue_depth = self.queue.len(),
            "Verification job queued"
        );

        self.event_bus.emit_lossy(VerifierEvent::VerificationQueued {
            job_id,
            requester_id,
            channel_id,
            timestamp: Utc::now(),
        });

        Ok(job_id)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobRequest, TriggerKind};
    use claimguard_common::config::RateLimitConfig;

    fn job(requester_id: u64) -> VerificationJob {
        VerificationJob::new(JobRequest {
            requester_id,
            group_id: Some(5),
            channel_id: 10,
            message_id: None,
            statement_author_id: None,
            claim: "Water boils at 100C at sea level".to_string(),
            trigger: TriggerKind::Mention,
            placeholder_message_id: None,
        })
        .unwrap()
    }

    fn submitter(queue_capacity: usize) -> Submitter {
        let limits = RateLimitConfig {
            user_cooldown_secs: 30,
            ..RateLimitConfig::default()
        };
        Submitter::new(
            Arc::new(AdmissionController::new(limits)),
            JobQueue::new(queue_capacity),
            EventBus::new(16),
        )
    }

    #[tokio::test]
    async fn test_accepted_job_is_queued_and_announced() {
        let submitter = submitter(4);
        let mut events = submitter.event_bus.subscribe();

        let job_id = submitter.submit(job(1)).unwrap();
        assert_eq!(submitter.queue().len(), 1);

        match events.recv().await.unwrap() {
            VerifierEvent::VerificationQueued { job_id: queued, .. } => assert_eq!(queued, job_id),
            other => panic!("unexpected event {:?}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_cooldown_rejection() {
        let submitter = submitter(4);
        submitter.submit(job(1)).unwrap();

        let err = submitter.submit(job(1)).unwrap_err();
        assert_eq!(err, SubmitError::AdmissionRejected(Rejection::CooldownActive));
        assert_eq!(submitter.queue().len(), 1);

        let rejected: Result<Uuid, SubmitError> = Err(err);
        let outcome = SubmitOutcome::from(&rejected);
        assert!(!outcome.accepted);
        assert_eq!(outcome.reason, Rejection::CooldownActive.to_string());
    }

    #[tokio::test]
    async fn test_full_queue() {
        let submitter = submitter(1);
        submitter.submit(job(1)).unwrap();
        assert_eq!(submitter.submit(job(2)), Err(SubmitError::QueueFull));
    }
}
