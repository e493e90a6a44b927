//! Source-locked response validation
//!
//! A model answer must stay anchored to the evidence it was given:
//! - with no sources, only UNVERIFIABLE or MIXED is allowed
//! - with sources, the reasoning must contain at least one `[N]` tag
//! - every `[N]` must name a provided source (1-based)
//!
//! Any violation downgrades the answer to UNVERIFIABLE at confidence 0.15.

use chrono::Utc;
use claimguard_common::text::truncate_chars;
use claimguard_common::{Source, TokenUsage, ValidationOutcome, Verdict, VerificationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::models::ParsedRecord;

pub const DOWNGRADED_CONFIDENCE: f64 = 0.15;
const ORIGINAL_EXCERPT_CHARS: usize = 200;

static CITATION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\[(\d+)\]").ok());

/// Collect every rule the record breaks, in rule order
pub fn violations(record: &ParsedRecord, source_count: usize) -> Vec<String> {
    let mut violations = Vec::new();

    if source_count == 0 && !matches!(record.verdict, Verdict::Unverifiable | Verdict::Mixed) {
        violations.push("No sources provided but verdict claims certainty".to_string());
    }

    let citations: Vec<&str> = CITATION
        .as_ref()
        .map(|re| {
            re.captures_iter(&record.reasoning)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if source_count > 0 && citations.is_empty() {
        violations.push("Reasoning contains no citation tags [N]".to_string());
    }

    for tag in citations {
        // Digit runs too long for usize are out of range by definition
        let in_range = tag
            .parse::<usize>()
            .is_ok_and(|index| (1..=source_count).contains(&index));
        if !in_range {
            violations.push(format!(
                "Citation [{tag}] out of range (have {source_count} sources)"
            ));
        }
    }

    violations
}

/// Check a parsed record against the evidence and finalize it
pub fn validate(
    record: ParsedRecord,
    sources: Vec<Source>,
    model: &str,
    usage: Option<TokenUsage>,
) -> VerificationResult {
    let violations = violations(&record, sources.len());

    let (verdict, confidence, reasoning, validation) = if violations.is_empty() {
        (
            record.verdict,
            record.confidence,
            record.reasoning,
            ValidationOutcome::passed(),
        )
    } else {
        info!(
            model = %model,
            verdict = %record.verdict,
            violations = ?violations,
            "Model answer failed source-locked validation"
        );
        let reasoning = format!(
            "Validation failed: {}. Original: {}",
            violations.join("; "),
            truncate_chars(&record.reasoning, ORIGINAL_EXCERPT_CHARS)
        );
        (
            Verdict::Unverifiable,
            DOWNGRADED_CONFIDENCE,
            reasoning,
            ValidationOutcome::failed(violations),
        )
    };

    VerificationResult {
        statement: record.statement,
        verdict,
        confidence,
        reasoning,
        sources,
        model: model.to_string(),
        usage,
        validation,
        checked_at: Utc::now(),
    }
}
