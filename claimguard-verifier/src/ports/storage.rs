//! Result persistence collaborator

use async_trait::async_trait;
use chrono::Utc;
use claimguard_common::VerificationResult;
use thiserror::Error;
use tracing::debug;

use super::delivery::DeliveryReceipt;
use crate::models::VerificationJob;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write record: {0}")]
    Write(String),
}

/// Record a finished verification
#[async_trait]
pub trait Storage: Send + Sync {
    async fn store(
        &self,
        job: &VerificationJob,
        result: &VerificationResult,
        receipt: Option<&DeliveryReceipt>,
    ) -> Result<(), StorageError>;
}

/// Storage that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardStorage;

#[async_trait]
impl Storage for DiscardStorage {
    async fn store(
        &self,
        job: &VerificationJob,
        result: &VerificationResult,
        receipt: Option<&DeliveryReceipt>,
    ) -> Result<(), StorageError> {
        let latency_ms = Utc::now()
            .signed_duration_since(job.submitted_at())
            .num_milliseconds()
            .max(0);
        debug!(
            job_id = %job.job_id(),
            trigger = ?job.trigger(),
            latency_ms,
            requester_id = job.requester_id(),
            statement_author_id = job.statement_author_id(),
            verdict = %result.verdict,
            message_id = ?receipt.and_then(|r| r.message_id),
            "Discarding verification record"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobRequest, TriggerKind};

    #[tokio::test]
    async fn test_discard_storage_accepts_every_record() {
        let job = VerificationJob::new(JobRequest {
            requester_id: 1,
            group_id: None,
            channel_id: 2,
            message_id: None,
            statement_author_id: Some(3),
            claim: "claim".to_string(),
            trigger: TriggerKind::Command,
            placeholder_message_id: None,
        })
        .unwrap();
        let result = VerificationResult::unverifiable("claim", 0.1, "none", Vec::new(), "m");

        assert_eq!(DiscardStorage.store(&job, &result, None).await, Ok(()));
    }
}
