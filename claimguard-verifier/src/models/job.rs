//! Verification job submitted by a caller

use chrono::{DateTime, Utc};
use claimguard_common::text::{truncate_chars, MAX_STATEMENT_CHARS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How the caller triggered the check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Reply,
    Mention,
    Command,
    ContextMenu,
}

/// Caller-supplied job description (also the `POST /verify` body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub requester_id: u64,
    #[serde(default)]
    pub group_id: Option<u64>,
    pub channel_id: u64,
    #[serde(default)]
    pub message_id: Option<u64>,
    /// Author of the checked statement, when different from the requester
    #[serde(default)]
    pub statement_author_id: Option<u64>,
    pub claim: String,
    pub trigger: TriggerKind,
    /// Message to update in place with the result
    #[serde(default)]
    pub placeholder_message_id: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("claim text is empty")]
    EmptyClaim,
}

/// A job that passed validation; immutable once built
#[derive(Debug, Clone)]
pub struct VerificationJob {
    job_id: Uuid,
    requester_id: u64,
    group_id: Option<u64>,
    channel_id: u64,
    message_id: Option<u64>,
    statement_author_id: Option<u64>,
    claim: String,
    trigger: TriggerKind,
    placeholder_message_id: Option<u64>,
    submitted_at: DateTime<Utc>,
}

impl VerificationJob {
    /// Build a job, trimming the claim and capping it at 500 characters
    pub fn new(request: JobRequest) -> Result<Self, JobError> {
        let claim = request.claim.trim();
        if claim.is_empty() {
            return Err(JobError::EmptyClaim);
        }

        Ok(Self {
            job_id: Uuid::new_v4(),
            requester_id: request.requester_id,
            group_id: request.group_id,
            channel_id: request.channel_id,
            message_id: request.message_id,
            statement_author_id: request.statement_author_id,
            claim: truncate_chars(claim, MAX_STATEMENT_CHARS).to_string(),
            trigger: request.trigger,
            placeholder_message_id: request.placeholder_message_id,
            submitted_at: Utc::now(),
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn requester_id(&self) -> u64 {
        self.requester_id
    }

    pub fn group_id(&self) -> Option<u64> {
        self.group_id
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn message_id(&self) -> Option<u64> {
        self.message_id
    }

    /// Falls back to the requester when no separate author was given
    pub fn statement_author_id(&self) -> u64 {
        self.statement_author_id.unwrap_or(self.requester_id)
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn placeholder_message_id(&self) -> Option<u64> {
        self.placeholder_message_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
