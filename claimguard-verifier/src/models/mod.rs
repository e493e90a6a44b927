//! Data models for the verification pipeline

pub mod evidence;
pub mod job;
pub mod parsed;

pub use evidence::EvidenceItem;
pub use job::{JobError, JobRequest, TriggerKind, VerificationJob};
pub use parsed::{CitedSource, ParsedRecord, RawConfidence, RawRecord, RawSource};
