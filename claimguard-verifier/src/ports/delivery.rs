//! Result delivery collaborator

use async_trait::async_trait;
use chrono::Utc;
use claimguard_common::events::{EventBus, VerifierEvent};
use claimguard_common::VerificationResult;
use thiserror::Error;
use tracing::debug;

use crate::models::VerificationJob;

/// Where a result ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Message carrying the result, if the channel has message ids
    pub message_id: Option<u64>,
    /// True when an existing placeholder message was edited
    pub updated_in_place: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery channel unavailable: {0}")]
    Unavailable(String),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Hand a finished result back to whoever asked
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(
        &self,
        job: &VerificationJob,
        result: &VerificationResult,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Publishes completed verifications on the event bus
///
/// SSE clients and chat adapters subscribe and render the result. The
/// placeholder id rides along so the adapter can edit it in place.
#[derive(Debug, Clone)]
pub struct EventBusDelivery {
    event_bus: EventBus,
}

impl EventBusDelivery {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl Delivery for EventBusDelivery {
    async fn deliver(
        &self,
        job: &VerificationJob,
        result: &VerificationResult,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let event = VerifierEvent::VerificationCompleted {
            job_id: job.job_id(),
            requester_id: job.requester_id(),
            group_id: job.group_id(),
            channel_id: job.channel_id(),
            message_id: job.message_id(),
            placeholder_message_id: job.placeholder_message_id(),
            result: Box::new(result.clone()),
            timestamp: Utc::now(),
        };

        // No subscribers is not a failure; the result is still stored
        let subscribers = self.event_bus.emit(event).unwrap_or(0);
        debug!(job_id = %job.job_id(), subscribers, "Published verification result");

        Ok(DeliveryReceipt {
            message_id: job.placeholder_message_id(),
            updated_in_place: job.placeholder_message_id().is_some(),
        })
    }
}
