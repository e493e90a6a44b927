//! Verification result data model
//!
//! These types cross the crate boundary: the verifier produces them and the
//! event bus carries them to delivery adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::{truncate_chars, MAX_STATEMENT_CHARS};

/// Final verdict on a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    True,
    False,
    Mixed,
    Unverifiable,
}

impl Verdict {
    /// Upper-case wire name ("TRUE", "FALSE", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::Mixed => "MIXED",
            Verdict::Unverifiable => "UNVERIFIABLE",
        }
    }

    /// Parse a verdict case-insensitively
    ///
    /// Returns `None` for anything outside the four allowed values.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Some(Verdict::True),
            "FALSE" => Some(Verdict::False),
            "MIXED" => Some(Verdict::Mixed),
            "UNVERIFIABLE" => Some(Verdict::Unverifiable),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified piece of retrieved evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Display name ("Reuters", "CDC", ...)
    pub name: String,
    pub url: String,
    /// Trust tier, 1 (fact-checkers) through 4 (social platforms)
    pub tier: u8,
    pub snippet: String,
    /// Full-text body when the retrieval backend supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Token counters reported by a model backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Outcome of the source-locked citation check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// True only when the result went through validation and satisfied it
    pub passed: bool,
    pub violations: Vec<String>,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    pub fn failed(violations: Vec<String>) -> Self {
        Self {
            passed: false,
            violations,
        }
    }

    /// Validation never ran (e.g. every model in the chain failed)
    pub fn not_run() -> Self {
        Self::failed(Vec::new())
    }
}

/// Finalized verification of a single claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Restated claim, at most 500 characters
    pub statement: String,
    pub verdict: Verdict,
    /// Always within [0.0, 1.0]
    pub confidence: f64,
    pub reasoning: String,
    pub sources: Vec<Source>,
    /// Model identifier that produced the answer
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub validation: ValidationOutcome,
    pub checked_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Build an UNVERIFIABLE result for a path that never reached a model answer
    pub fn unverifiable(
        claim: &str,
        confidence: f64,
        reasoning: impl Into<String>,
        sources: Vec<Source>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            statement: truncate_chars(claim, MAX_STATEMENT_CHARS).to_string(),
            verdict: Verdict::Unverifiable,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            sources,
            model: model.into(),
            usage: None,
            validation: ValidationOutcome::not_run(),
            checked_at: Utc::now(),
        }
    }
}

/// Clamp a confidence value into [0.0, 1.0]; NaN becomes 0.0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
