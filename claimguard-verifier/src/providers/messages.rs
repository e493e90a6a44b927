//! Anthropic-style messages backend (`POST {base}/v1/messages`)

use async_trait::async_trait;
use claimguard_common::TokenUsage;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{self, ApiKey};
use super::{Completion, ModelBackend, ModelRequest, ProviderError};

pub const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MessagesBackend {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl MessagesBackend {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: ApiKey::new(api_key),
        }
    }

    fn payload(request: &ModelRequest) -> Value {
        json!({
            "model": request.model,
            "system": request.system_prompt,
            "messages": [{ "role": "user", "content": request.user_prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

/// First text block plus input/output token counts
pub(crate) fn decode(envelope: Value) -> Result<Completion, ProviderError> {
    let response: MessagesResponse = serde_json::from_value(envelope)
        .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;

    let text = response
        .content
        .iter()
        .find(|block| block.kind == "text")
        .map(|block| block.text.as_deref().unwrap_or_default());

    let usage = response.usage.map(|usage| TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage
            .input_tokens
            .zip(usage.output_tokens)
            .and_then(|(input, output)| input.checked_add(output)),
    });

    Ok(Completion {
        text: http::require_text(text)?,
        usage,
    })
}

#[async_trait]
impl ModelBackend for MessagesBackend {
    async fn invoke(&self, request: &ModelRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, model = %request.model, "Sending messages request");

        let envelope = http::send_json(
            self.client
                .post(&url)
                .header("x-api-key", self.api_key.expose())
                .header("anthropic-version", API_VERSION)
                .json(&Self::payload(request)),
        )
        .await?;

        decode(envelope)
    }

    async fn probe(&self) -> String {
        let url = format!("{}/v1/models", self.base_url);
        http::probe(
            self.client
                .get(&url)
                .header("x-api-key", self.api_key.expose())
                .header("anthropic-version", API_VERSION),
            &self.base_url,
        )
        .await
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
