//! Model response parser
//!
//! Turns free-form model output into a [`ParsedRecord`]. Parsing never
//! fails: each stage below is tried in order and the first one that yields
//! a JSON object wins.
//!
//! 1. Strip a Markdown code fence and parse directly
//! 2. Parse the first-`{`-to-last-`}` span
//! 3. Repair the span: escape stray quotes, strip trailing commas, both
//! 4. Pull `verdict`, `confidence` and `reasoning` out with regexes
//!
//! When nothing works the fixed fallback record is returned.
//!
//! Whole-number confidences above 1 are read as percentages (`87` becomes
//! `0.87`). This is a heuristic: an integer confidence of `5` meant as
//! something else still becomes `0.05`.

use claimguard_common::text::{truncate_chars, MAX_STATEMENT_CHARS};
use claimguard_common::verification::clamp_confidence;
use claimguard_common::Verdict;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{CitedSource, ParsedRecord, RawConfidence, RawRecord, RawSource};

pub const FALLBACK_CONFIDENCE: f64 = 0.1;
pub const FALLBACK_REASONING: &str = "Failed to parse model response as JSON.";
pub const MISSING_REASONING: &str = "No reasoning provided.";
pub const EXTRACTED_REASONING: &str = "Extracted from malformed response.";
const EXTRACTED_DEFAULT_CONFIDENCE: f64 = 0.5;
const UNKNOWN_SOURCE: &str = "Unknown";

static TRAILING_COMMA_OBJECT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r",\s*\}").ok());
static TRAILING_COMMA_ARRAY: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r",\s*\]").ok());
static VERDICT_FIELD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)"verdict"\s*:\s*"([^"]*)""#).ok());
static CONFIDENCE_FIELD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""confidence"\s*:\s*([0-9.]+)"#).ok());
static REASONING_FIELD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""reasoning"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok());

/// Parse raw model output into a normalized record
///
/// `claim` fills the statement when the model omitted it.
pub fn parse(raw: &str, claim: &str) -> ParsedRecord {
    match extract(raw) {
        Some(record) => normalize(record, claim),
        None => {
            warn!(
                response_len = raw.len(),
                "Model response could not be parsed, using fallback record"
            );
            fallback(claim)
        }
    }
}

/// Apply defaults and constraints to a partial record
pub fn normalize(record: RawRecord, claim: &str) -> ParsedRecord {
    let verdict = record
        .verdict
        .as_deref()
        .and_then(Verdict::from_label)
        .unwrap_or(Verdict::Unverifiable);

    let confidence = match record.confidence {
        Some(RawConfidence::Integer(value)) if value > 1 => value as f64 / 100.0,
        Some(RawConfidence::Integer(value)) => value as f64,
        Some(RawConfidence::Float(value)) => value,
        Some(RawConfidence::Invalid) | None => 0.0,
    };

    let statement = record.statement.as_deref().unwrap_or(claim);

    let cited_sources = record
        .sources
        .unwrap_or_default()
        .into_iter()
        .filter_map(|source| match source {
            RawSource::Name(name) => Some(CitedSource { name, url: None }),
            RawSource::Object { name, url } => Some(CitedSource {
                name: name.unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                url,
            }),
            RawSource::Other => None,
        })
        .collect();

    ParsedRecord {
        statement: truncate_chars(statement, MAX_STATEMENT_CHARS).to_string(),
        verdict,
        confidence: clamp_confidence(confidence),
        reasoning: record
            .reasoning
            .unwrap_or_else(|| MISSING_REASONING.to_string()),
        cited_sources,
    }
}

/// The record used when every parse stage fails
pub fn fallback(claim: &str) -> ParsedRecord {
    ParsedRecord {
        statement: truncate_chars(claim, MAX_STATEMENT_CHARS).to_string(),
        verdict: Verdict::Unverifiable,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: FALLBACK_REASONING.to_string(),
        cited_sources: Vec::new(),
    }
}

fn extract(raw: &str) -> Option<RawRecord> {
    let content = strip_code_fence(raw);
    if let Some(record) = parse_object(content) {
        return Some(record);
    }

    let candidate = object_span(content)?;
    if let Some(record) = parse_object(candidate) {
        debug!("Parsed model response from embedded object");
        return Some(record);
    }

    let record = repair(candidate);
    if record.is_some() {
        debug!("Parsed model response after repair");
    }
    record
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn object_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

/// Parse JSON, accepting only objects
fn parse_object(text: &str) -> Option<RawRecord> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(RawRecord::from_object(&object)),
        _ => None,
    }
}

fn repair(candidate: &str) -> Option<RawRecord> {
    let escaped = escape_stray_quotes(candidate);
    parse_object(&escaped)
        .or_else(|| parse_object(&strip_trailing_commas(candidate)))
        .or_else(|| parse_object(&strip_trailing_commas(&escaped)))
        .or_else(|| extract_fields(candidate))
}

/// Escape quotes that sit inside a string value without ending it
///
/// A quote inside a string closes it only when the next non-whitespace
/// character is `:`, `,`, `}` or `]`, or the input ends.
fn escape_stray_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut chars = text.char_indices();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' if in_string => {
                out.push(ch);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' if !in_string => {
                in_string = true;
                out.push(ch);
            }
            '"' => {
                let rest = text[index + ch.len_utf8()..].trim_start();
                let closes = rest.is_empty() || rest.starts_with(&[':', ',', '}', ']'][..]);
                if closes {
                    in_string = false;
                    out.push('"');
                } else {
                    out.push_str("\\\"");
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

fn strip_trailing_commas(text: &str) -> String {
    let mut repaired = text.to_string();
    if let Some(re) = TRAILING_COMMA_OBJECT.as_ref() {
        repaired = re.replace_all(&repaired, "}").into_owned();
    }
    if let Some(re) = TRAILING_COMMA_ARRAY.as_ref() {
        repaired = re.replace_all(&repaired, "]").into_owned();
    }
    repaired
}

/// Last resort: regex out the individual fields
///
/// Requires a verdict. An unreadable confidence literal aborts extraction.
fn extract_fields(text: &str) -> Option<RawRecord> {
    let verdict = VERDICT_FIELD
        .as_ref()?
        .captures(text)?
        .get(1)?
        .as_str()
        .to_string();

    let confidence = match CONFIDENCE_FIELD
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
    {
        Some(literal) => Some(confidence_literal(literal.as_str())?),
        None => Some(RawConfidence::Float(EXTRACTED_DEFAULT_CONFIDENCE)),
    };

    let reasoning = REASONING_FIELD
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_json_string(m.as_str()))
        .unwrap_or_else(|| EXTRACTED_REASONING.to_string());

    Some(RawRecord {
        statement: None,
        verdict: Some(verdict),
        confidence,
        reasoning: Some(reasoning),
        sources: Some(Vec::new()),
    })
}

fn confidence_literal(literal: &str) -> Option<RawConfidence> {
    if literal.contains('.') {
        literal.parse::<f64>().ok().map(RawConfidence::Float)
    } else {
        literal.parse::<i64>().ok().map(RawConfidence::Integer)
    }
}

fn unescape_json_string(body: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{body}\"")).unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIM: &str = "The moon is made of cheese";

    #[test]
    fn test_patterns_compile() {
        assert!(TRAILING_COMMA_OBJECT.is_some());
        assert!(TRAILING_COMMA_ARRAY.is_some());
        assert!(VERDICT_FIELD.is_some());
        assert!(CONFIDENCE_FIELD.is_some());
        assert!(REASONING_FIELD.is_some());
    }

    #[test]
    fn test_code_fence_and_percentage() {
        let raw = "```json\n{\"verdict\":\"true\",\"confidence\":87,\"reasoning\":\"ok [1]\"}\n```";
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::True);
        assert!((record.confidence - 0.87).abs() < 1e-9);
        assert_eq!(record.reasoning, "ok [1]");
        assert_eq!(record.statement, CLAIM);
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let raw = r#"{"verdict":"FALSE", "confidence":0.9,}"#;
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::False);
        assert!((record.confidence - 0.9).abs() < 1e-9);
        assert_eq!(record.reasoning, MISSING_REASONING);
    }

    #[test]
    fn test_garbage_yields_fallback() {
        let record = parse("I cannot help with that.", CLAIM);
        assert_eq!(record, fallback(CLAIM));
        assert_eq!(record.verdict, Verdict::Unverifiable);
        assert_eq!(record.confidence, 0.1);
        assert!(record.cited_sources.is_empty());
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let raw = "Here is my answer: {\"verdict\":\"MIXED\",\"confidence\":0.4,\"reasoning\":\"partly [2]\"} hope it helps";
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::Mixed);
        assert!((record.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_stray_quotes_escaped() {
        let raw = r#"{"verdict":"FALSE","confidence":0.8,"reasoning":"He said "no" to it [1]"}"#;
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::False);
        assert_eq!(record.reasoning, r#"He said "no" to it [1]"#);
    }

    #[test]
    fn test_regex_extraction() {
        // Missing comma after the confidence defeats every JSON repair
        let raw = r#"{"verdict": "mixed", "confidence": 70 "reasoning": "partly [1]"}"#;
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::Mixed);
        assert!((record.confidence - 0.7).abs() < 1e-9);
        assert_eq!(record.reasoning, "partly [1]");
    }

    #[test]
    fn test_regex_extraction_defaults() {
        let raw = r#"{"verdict": "true", oops}"#;
        let record = parse(raw, CLAIM);
        assert_eq!(record.verdict, Verdict::True);
        assert!((record.confidence - 0.5).abs() < 1e-9);
        assert_eq!(record.reasoning, EXTRACTED_REASONING);
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert_eq!(parse("\"just a string\"", CLAIM), fallback(CLAIM));
        assert_eq!(parse("[1, 2, 3]", CLAIM), fallback(CLAIM));
    }

    #[test]
    fn test_unknown_verdict_and_missing_fields() {
        let record = parse(r#"{"verdict":"maybe"}"#, CLAIM);
        assert_eq!(record.verdict, Verdict::Unverifiable);
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.reasoning, MISSING_REASONING);
    }

    #[test]
    fn test_confidence_normalization() {
        let conf = |raw: &str| parse(raw, CLAIM).confidence;
        assert_eq!(conf(r#"{"verdict":"TRUE","confidence":1}"#), 1.0);
        assert!((conf(r#"{"verdict":"TRUE","confidence":5}"#) - 0.05).abs() < 1e-9);
        assert_eq!(conf(r#"{"verdict":"TRUE","confidence":1.5}"#), 1.0);
        assert_eq!(conf(r#"{"verdict":"TRUE","confidence":-3}"#), 0.0);
        assert_eq!(conf(r#"{"verdict":"TRUE","confidence":"high"}"#), 0.0);
    }

    #[test]
    fn test_sources_promoted() {
        let raw = r#"{"verdict":"TRUE","confidence":0.9,"reasoning":"x [1]",
            "sources":["Reuters",{"url":"https://a.example"},5]}"#;
        let record = parse(raw, CLAIM);
        assert_eq!(
            record.cited_sources,
            vec![
                CitedSource {
                    name: "Reuters".to_string(),
                    url: None
                },
                CitedSource {
                    name: "Unknown".to_string(),
                    url: Some("https://a.example".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_statement_capped() {
        let long = "x".repeat(800);
        let raw = format!(r#"{{"verdict":"FALSE","statement":"{long}"}}"#);
        assert_eq!(parse(&raw, CLAIM).statement.chars().count(), 500);
    }
}
