//! Shared HTTP plumbing for model backends

use std::fmt;
use std::time::Duration;

use claimguard_common::text::truncate_chars;
use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::ProviderError;

/// User-Agent sent with every model call
pub const USER_AGENT: &str = concat!("claimguard-verifier/", env!("CARGO_PKG_VERSION"));

/// Error bodies are cut to this many characters before they reach logs
const MAX_ERROR_BODY_CHARS: usize = 500;

/// API credential that never shows up in `Debug` output
#[derive(Clone, Default)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_empty() { "<unset>" } else { "<redacted>" })
    }
}

/// HTTP client with the verifier's User-Agent and a hard request timeout
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(USER_AGENT),
    );

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {}", e)))
}

fn from_reqwest(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Send a request and decode the JSON envelope
///
/// Non-2xx statuses become [`ProviderError::Http`] with a truncated body.
pub async fn send_json(request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(from_reqwest)?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body: truncate_chars(&body, MAX_ERROR_BODY_CHARS).to_string(),
        });
    }

    let body = response.text().await.map_err(from_reqwest)?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::MalformedEnvelope(format!("response is not JSON: {}", e)))
}

/// Non-empty text or [`ProviderError::EmptyContent`]
pub fn require_text(text: Option<&str>) -> Result<String, ProviderError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(ProviderError::EmptyContent),
        None => Err(ProviderError::MalformedEnvelope(
            "answer text missing from response".to_string(),
        )),
    }
}

/// Report how a diagnostic GET went, in one line
pub async fn probe(request: RequestBuilder, endpoint: &str) -> String {
    match request.send().await {
        Ok(response) if response.status().is_success() => {
            format!("{} reachable (HTTP {})", endpoint, response.status().as_u16())
        }
        Ok(response) => format!(
            "{} responded with HTTP {}",
            endpoint,
            response.status().as_u16()
        ),
        Err(err) => {
            debug!(endpoint = %endpoint, error = %err, "Endpoint probe failed");
            format!("{} unreachable: {}", endpoint, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_redacted() {
        assert_eq!(format!("{:?}", ApiKey::new("sk-secret")), "<redacted>");
        assert_eq!(format!("{:?}", ApiKey::default()), "<unset>");
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(Some("{}")).unwrap(), "{}");
        assert_eq!(require_text(Some("  ")), Err(ProviderError::EmptyContent));
        assert!(matches!(
            require_text(None),
            Err(ProviderError::MalformedEnvelope(_))
        ));
    }
}
