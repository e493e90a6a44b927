//! Model backends and the orchestration around them
//!
//! Every backend speaks one capability interface, [`ModelBackend`]. The
//! concrete set is closed and selected once at startup through
//! [`Provider::from_config`].

pub mod chat_completions;
pub mod gemini;
pub mod http;
pub mod messages;
pub mod model_chain;
pub mod orchestrator;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use claimguard_common::config::{ProviderConfig, ProviderKind};
use claimguard_common::TokenUsage;
use thiserror::Error;

pub use chat_completions::ChatCompletionsBackend;
pub use gemini::GeminiBackend;
pub use messages::MessagesBackend;
pub use model_chain::ModelChain;
pub use orchestrator::ProviderOrchestrator;

/// One model invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Raw text answer plus whatever usage the backend reported
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Backend call failures
///
/// Rate limits, server errors, network trouble, timeouts and unusable
/// envelopes are transient and worth another attempt. Any other 4xx is
/// terminal for that model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),

    #[error("model returned empty content")]
    EmptyContent,
}

impl ProviderError {
    /// Whether retrying the same model can help
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Transport(_)
            | ProviderError::Timeout
            | ProviderError::MalformedEnvelope(_)
            | ProviderError::EmptyContent => true,
        }
    }
}

/// Capability interface shared by every model backend
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send one request and return the raw answer text
    async fn invoke(&self, request: &ModelRequest) -> Result<Completion, ProviderError>;

    /// Short human-readable reachability report for diagnostics
    async fn probe(&self) -> String;

    /// Base URL requests go to
    fn endpoint(&self) -> &str;
}

/// The closed set of supported backends
#[derive(Debug)]
pub enum Provider {
    ChatCompletions(ChatCompletionsBackend),
    Gemini(GeminiBackend),
    Messages(MessagesBackend),
}

impl Provider {
    /// Build the backend named by the configuration
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = http::build_client(timeout)?;
        let base_url = config.resolved_base_url();
        let api_key = config.api_key.clone();

        Ok(match config.kind {
            ProviderKind::ChatCompletions => {
                Provider::ChatCompletions(ChatCompletionsBackend::new(client, base_url, api_key))
            }
            ProviderKind::Gemini => Provider::Gemini(GeminiBackend::new(client, base_url, api_key)),
            ProviderKind::Messages => {
                Provider::Messages(MessagesBackend::new(client, base_url, api_key))
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::ChatCompletions(_) => ProviderKind::ChatCompletions,
            Provider::Gemini(_) => ProviderKind::Gemini,
            Provider::Messages(_) => ProviderKind::Messages,
        }
    }
}

#[async_trait]
impl ModelBackend for Provider {
    async fn invoke(&self, request: &ModelRequest) -> Result<Completion, ProviderError> {
        match self {
            Provider::ChatCompletions(backend) => backend.invoke(request).await,
            Provider::Gemini(backend) => backend.invoke(request).await,
            Provider::Messages(backend) => backend.invoke(request).await,
        }
    }

    async fn probe(&self) -> String {
        match self {
            Provider::ChatCompletions(backend) => backend.probe().await,
            Provider::Gemini(backend) => backend.probe().await,
            Provider::Messages(backend) => backend.probe().await,
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            Provider::ChatCompletions(backend) => backend.endpoint(),
            Provider::Gemini(backend) => backend.endpoint(),
            Provider::Messages(backend) => backend.endpoint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let http = |status| ProviderError::Http {
            status,
            body: String::new(),
        };
        assert!(http(429).is_transient());
        assert!(http(500).is_transient());
        assert!(http(503).is_transient());
        assert!(!http(400).is_transient());
        assert!(!http(401).is_transient());
        assert!(!http(404).is_transient());
        assert!(ProviderError::Transport("reset".into()).is_transient());
        assert!(ProviderError::Timeout.is_transient());
        assert!(ProviderError::MalformedEnvelope("x".into()).is_transient());
        assert!(ProviderError::EmptyContent.is_transient());
    }

    #[test]
    fn test_provider_selected_from_kind() {
        let mut config = ProviderConfig::default();
        config.kind = ProviderKind::Messages;
        let provider = Provider::from_config(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Messages);
        assert_eq!(provider.endpoint(), "https://api.anthropic.com");

        config.kind = ProviderKind::Gemini;
        config.base_url = Some("http://localhost:9000/".into());
        let provider = Provider::from_config(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert_eq!(provider.endpoint(), "http://localhost:9000");
    }
}
