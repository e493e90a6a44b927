//! OpenAI-compatible chat completions backend
//!
//! Covers OpenAI, OpenRouter and self-hosted servers exposing
//! `POST {base}/chat/completions` with bearer authentication.

use async_trait::async_trait;
use claimguard_common::TokenUsage;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{self, ApiKey};
use super::{Completion, ModelBackend, ModelRequest, ProviderError};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionsBackend {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl ChatCompletionsBackend {
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
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": { "type": "json_object" },
        })
    }
}

/// Pull the answer out of a chat completions envelope
///
/// Some servers return the JSON answer as an object instead of a string;
/// it is re-serialized so the parser sees text either way.
pub(crate) fn decode(envelope: Value) -> Result<Completion, ProviderError> {
    let response: ChatResponse = serde_json::from_value(envelope)
        .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedEnvelope("no choices in response".to_string()))?;

    let text = match choice.message.content {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Ok(Completion {
        text: http::require_text(Some(&text))?,
        usage: response.usage.map(|usage| TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }),
    })
}

#[async_trait]
impl ModelBackend for ChatCompletionsBackend {
    async fn invoke(&self, request: &ModelRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let envelope = http::send_json(
            self.client
                .post(&url)
                .bearer_auth(self.api_key.expose())
                .json(&Self::payload(request)),
        )
        .await?;

        decode(envelope)
    }

    async fn probe(&self) -> String {
        let url = format!("{}/models", self.base_url);
        http::probe(
            self.client.get(&url).bearer_auth(self.api_key.expose()),
            &self.base_url,
        )
        .await
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_and_usage() {
        let envelope = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"verdict\":\"TRUE\"}" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150 }
        });
        let completion = decode(envelope).unwrap();
        assert_eq!(completion.text, "{\"verdict\":\"TRUE\"}");
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                input_tokens: Some(120),
                output_tokens: Some(30),
                total_tokens: Some(150),
            })
        );
    }

    #[test]
    fn test_decode_object_content() {
        let envelope = json!({
            "choices": [{ "message": { "content": { "verdict": "FALSE" } } }]
        });
        let completion = decode(envelope).unwrap();
        assert_eq!(completion.text, r#"{"verdict":"FALSE"}"#);
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode(json!({ "choices": [] })),
            Err(ProviderError::MalformedEnvelope(_))
        ));
        assert_eq!(
            decode(json!({ "choices": [{ "message": { "content": null } }] })),
            Err(ProviderError::EmptyContent)
        );
    }

    #[test]
    fn test_payload_shape() {
        let request = ModelRequest {
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
            model: "openai/gpt-4o-mini".into(),
            temperature: 0.0,
            max_tokens: 500,
        };
        let payload = ChatCompletionsBackend::payload(&request);
        assert_eq!(payload["model"], "openai/gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "user");
        assert_eq!(payload["max_tokens"], 500);
    }
}
