//! # claimguard Common Library
//!
//! Shared code for the claimguard services including:
//! - Error type and result alias
//! - Configuration loading (TOML file + environment overrides)
//! - Verification result data model
//! - In-process event bus for delivering completed verifications
//! - Text helpers

pub mod config;
pub mod error;
pub mod events;
pub mod text;
pub mod verification;

pub use error::{Error, Result};
pub use verification::{Source, TokenUsage, ValidationOutcome, Verdict, VerificationResult};
