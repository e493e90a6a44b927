//! Model output records before and after normalization
//!
//! [`RawRecord`] mirrors whatever the model produced with every field
//! optional. [`ParsedRecord`] is the strict form produced by
//! `response_parser::normalize`.

use claimguard_common::Verdict;
use serde_json::{Map, Value};

/// Confidence as it appeared in the model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawConfidence {
    /// Integer literal (candidate for the whole-percentage rule)
    Integer(i64),
    Float(f64),
    /// Present but not a number
    Invalid,
}

/// A source entry as the model wrote it
#[derive(Debug, Clone, PartialEq)]
pub enum RawSource {
    /// Bare string, e.g. `"Reuters"`
    Name(String),
    Object { name: Option<String>, url: Option<String> },
    /// Anything else is dropped
    Other,
}

/// Unvalidated model output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub statement: Option<String>,
    /// `Some` only when the model sent a string
    pub verdict: Option<String>,
    pub confidence: Option<RawConfidence>,
    pub reasoning: Option<String>,
    pub sources: Option<Vec<RawSource>>,
}

impl RawRecord {
    /// Pick known fields out of a JSON object, ignoring wrong-typed ones
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let string_field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let confidence = object.get("confidence").map(|value| {
            if let Some(int) = value.as_i64() {
                RawConfidence::Integer(int)
            } else if let Some(float) = value.as_f64() {
                RawConfidence::Float(float)
            } else {
                RawConfidence::Invalid
            }
        });

        let sources = object.get("sources").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(name) => RawSource::Name(name.clone()),
                    Value::Object(fields) => RawSource::Object {
                        name: fields.get("name").and_then(Value::as_str).map(str::to_string),
                        url: fields.get("url").and_then(Value::as_str).map(str::to_string),
                    },
                    _ => RawSource::Other,
                })
                .collect()
        });

        Self {
            statement: string_field("statement"),
            verdict: string_field("verdict"),
            confidence,
            reasoning: string_field("reasoning"),
            sources,
        }
    }
}

/// Source named by the model in its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedSource {
    pub name: String,
    pub url: Option<String>,
}

/// Normalized model answer, ready for validation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub statement: String,
    pub verdict: Verdict,
    /// Within [0.0, 1.0]
    pub confidence: f64,
    pub reasoning: String,
    pub cited_sources: Vec<CitedSource>,
}
