//! Google AI Studio backend
//!
//! Uses the public `generateContent` REST endpoint:
//! `POST {base}/v1beta/models/{model}:generateContent`, authenticated with
//! the `x-goog-api-key` header. JSON output is requested through
//! `responseMimeType`.

use async_trait::async_trait;
use claimguard_common::TokenUsage;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{self, ApiKey};
use super::{Completion, ModelBackend, ModelRequest, ProviderError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl GeminiBackend {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: ApiKey::new(api_key),
        }
    }

    fn payload(request: &ModelRequest) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_prompt }] }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
                "responseMimeType": "application/json",
            },
        })
    }
}

pub(crate) fn decode(envelope: Value) -> Result<Completion, ProviderError> {
    let response: GenerateResponse = serde_json::from_value(envelope)
        .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;

    let text = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .map(|part| part.text.as_deref().unwrap_or_default());

    Ok(Completion {
        text: http::require_text(text)?,
        usage: response.usage_metadata.map(|usage| TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }),
    })
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn invoke(&self, request: &ModelRequest) -> Result<Completion, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        debug!(url = %url, model = %request.model, "Sending generateContent request");

        let envelope = http::send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", self.api_key.expose())
                .json(&Self::payload(request)),
        )
        .await?;

        decode(envelope)
    }

    async fn probe(&self) -> String {
        let url = format!("{}/v1beta/models", self.base_url);
        http::probe(
            self.client
                .get(&url)
                .header("x-goog-api-key", self.api_key.expose()),
            &self.base_url,
        )
        .await
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
