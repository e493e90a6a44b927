//! Event types and in-process event bus
//!
//! Completed verifications are published here; the SSE endpoint and any
//! other delivery adapter subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::verification::VerificationResult;

/// claimguard event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VerifierEvent {
    /// A job passed admission and entered the queue
    VerificationQueued {
        job_id: Uuid,
        requester_id: u64,
        channel_id: u64,
        timestamp: DateTime<Utc>,
    },

    /// A worker finished a job (success or terminal failure)
    VerificationCompleted {
        job_id: Uuid,
        requester_id: u64,
        group_id: Option<u64>,
        channel_id: u64,
        message_id: Option<u64>,
        /// Placeholder message to update in place, when the caller posted one
        placeholder_message_id: Option<u64>,
        result: Box<VerificationResult>,
        timestamp: DateTime<Utc>,
    },
}

impl VerifierEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            VerifierEvent::VerificationQueued { .. } => "VerificationQueued",
            VerifierEvent::VerificationCompleted { .. } => "VerificationCompleted",
        }
    }
}

/// Broadcast bus for [`VerifierEvent`]s
///
/// Subscribers only see events emitted after they subscribe. Slow
/// subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VerifierEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<VerifierEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: VerifierEvent,
    ) -> Result<usize, broadcast::error::SendError<VerifierEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: VerifierEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
