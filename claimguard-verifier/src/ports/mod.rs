//! Collaborator interfaces the pipeline depends on
//!
//! Search, delivery and persistence live outside this crate. Each is a
//! trait here with a minimal in-process implementation.

pub mod delivery;
pub mod retrieval;
pub mod storage;

pub use delivery::{Delivery, DeliveryError, DeliveryReceipt, EventBusDelivery};
pub use retrieval::{DisabledRetrieval, EvidenceRetrieval, RetrievalError, StaticRetrieval};
pub use storage::{DiscardStorage, Storage, StorageError};
