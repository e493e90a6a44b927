//! Provider orchestration
//!
//! Drives one verification through the model chain:
//! 1. No evidence: answer UNVERIFIABLE without calling any model
//! 2. Build the source-tagged prompt
//! 3. For each model, retry transient failures with a fixed backoff;
//!    terminal failures move on to the next model at once
//! 4. Parse and validate the first successful answer
//! 5. If every model fails, report the attempted models, the last error
//!    and an endpoint probe
//!
//! `analyze` never fails; every outcome is a [`VerificationResult`].

use std::sync::Arc;
use std::time::Duration;

use claimguard_common::config::{ProviderConfig, WorkerConfig};
use claimguard_common::{Source, VerificationResult};
use tracing::{debug, error, info, warn};

use super::model_chain::ModelChain;
use super::prompt::build_user_prompt;
use super::{Completion, ModelBackend, ModelRequest, ProviderError};
use crate::services::{response_parser, response_validator};

pub const NO_SOURCES_CONFIDENCE: f64 = 0.1;
pub const NO_SOURCES_REASONING: &str = "No sources available to verify this claim.";

/// Retry and sampling knobs
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Attempts per model, at least 1
    pub attempts_per_model: u32,
    pub retry_backoff: Duration,
    /// Wall-clock ceiling for a single backend call
    pub call_timeout: Duration,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl OrchestratorSettings {
    pub fn from_config(provider: &ProviderConfig, workers: &WorkerConfig) -> Self {
        Self {
            attempts_per_model: workers.attempts_per_model,
            retry_backoff: Duration::from_millis(workers.retry_backoff_ms),
            call_timeout: Duration::from_secs(workers.call_timeout_secs),
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default(), &WorkerConfig::default())
    }
}

pub struct ProviderOrchestrator {
    backend: Arc<dyn ModelBackend>,
    chain: ModelChain,
    system_prompt: String,
    settings: OrchestratorSettings,
}

impl std::fmt::Debug for ProviderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOrchestrator")
            .field("endpoint", &self.backend.endpoint())
            .field("chain", &self.chain)
            .field("settings", &self.settings)
            .finish()
    }
}

impl ProviderOrchestrator {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        chain: ModelChain,
        system_prompt: impl Into<String>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            backend,
            chain,
            system_prompt: system_prompt.into(),
            settings,
        }
    }

    pub fn chain(&self) -> &ModelChain {
        &self.chain
    }

    /// Verify a claim against already-classified sources
    pub async fn analyze(&self, claim: &str, sources: Vec<Source>) -> VerificationResult {
        if sources.is_empty() {
            info!(model = %self.chain.primary(), "No evidence retrieved, skipping model call");
            return VerificationResult::unverifiable(
                claim,
                NO_SOURCES_CONFIDENCE,
                NO_SOURCES_REASONING,
                Vec::new(),
                self.chain.primary(),
            );
        }

        let user_prompt = build_user_prompt(claim, &sources);
        let mut tried: Vec<&str> = Vec::with_capacity(self.chain.len());
        let mut last_error: Option<ProviderError> = None;

        for model in self.chain.models() {
            tried.push(model.as_str());
            match self.try_model(model, &user_prompt).await {
                Ok(completion) => {
                    let parsed = response_parser::parse(&completion.text, claim);
                    let result =
                        response_validator::validate(parsed, sources, model, completion.usage);
                    info!(
                        model = %model,
                        verdict = %result.verdict,
                        confidence = result.confidence,
                        validation_passed = result.validation.passed,
                        "Verification complete"
                    );
                    return result;
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "Model failed, moving down the chain");
                    last_error = Some(err);
                }
            }
        }

        let probe = self.backend.probe().await;
        let last_error = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no models configured".to_string());
        error!(
            models = ?tried,
            last_error = %last_error,
            endpoint = %self.backend.endpoint(),
            "All models failed"
        );

        let reasoning = format!(
            "Analysis failed after trying models [{}]. Last error: {}. Endpoint check: {}",
            tried.join(", "),
            last_error,
            probe
        );
        let model = tried.last().copied().unwrap_or_else(|| self.chain.primary());
        VerificationResult::unverifiable(claim, 0.0, reasoning, sources, model)
    }

    /// Run one model with retries for transient failures
    async fn try_model(&self, model: &str, user_prompt: &str) -> Result<Completion, ProviderError> {
        let request = ModelRequest {
            system_prompt: self.system_prompt.clone(),
            user_prompt: user_prompt.to_string(),
            model: model.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let attempts = self.settings.attempts_per_model.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(model = %model, attempt, "Invoking model");

            let outcome =
                match tokio::time::timeout(self.settings.call_timeout, self.backend.invoke(&request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProviderError::Timeout),
                };

            match outcome {
                Ok(completion) => {
                    if attempt > 1 {
                        debug!(model = %model, attempt, "Model call succeeded after retry");
                    }
                    return Ok(completion);
                }
                Err(err) if !err.is_transient() => {
                    warn!(model = %model, attempt, error = %err, "Terminal model error, not retrying");
                    return Err(err);
                }
                Err(err) if attempt >= attempts => {
                    warn!(model = %model, attempt, error = %err, "Model retries exhausted");
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        model = %model,
                        attempt,
                        error = %err,
                        backoff_ms = self.settings.retry_backoff.as_millis() as u64,
                        "Transient model error, will retry after backoff"
                    );
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
            }
        }
    }
}
