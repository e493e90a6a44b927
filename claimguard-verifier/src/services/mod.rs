//! Verification services
//!
//! Pure pipeline stages (classification, parsing, validation) plus the
//! stateful admission and submission front door.

pub mod admission_controller;
pub mod evidence_classifier;
pub mod response_parser;
pub mod response_validator;
pub mod submission;

pub use admission_controller::{Admission, AdmissionController, Rejection};
pub use submission::{SubmitError, SubmitOutcome, Submitter};
