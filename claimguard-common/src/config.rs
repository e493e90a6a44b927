//! Configuration loading and resolution
//!
//! Priority order for the config file:
//! 1. Command-line argument (highest priority)
//! 2. `CLAIMGUARD_CONFIG` environment variable
//! 3. `<config_dir>/claimguard/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! Environment overrides (`CLAIMGUARD_BIND`, provider API keys) are applied
//! on top of whatever the file produced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CLAIMGUARD_CONFIG";
/// Environment variable overriding `[server].bind`
pub const BIND_ENV: &str = "CLAIMGUARD_BIND";
/// API key variables, checked in order; the first non-empty one wins
pub const API_KEY_ENVS: [&str; 5] = [
    "LLM_API_KEY",
    "OPENROUTER_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GOOGLE_API_KEY",
];

/// Backend family used for model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions` (OpenAI, OpenRouter, custom hosts)
    #[default]
    #[serde(
        alias = "openai",
        alias = "openrouter",
        alias = "openai_compatible",
        alias = "custom"
    )]
    ChatCompletions,
    /// Google AI Studio `generateContent`
    #[serde(alias = "google", alias = "google_ai_studio")]
    Gemini,
    /// Anthropic-style `/v1/messages`
    #[serde(alias = "anthropic")]
    Messages,
}

impl ProviderKind {
    /// Base URL used when the config leaves `base_url` unset
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::ChatCompletions => "https://openrouter.ai/api/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Messages => "https://api.anthropic.com",
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5780".to_string(),
        }
    }
}

/// Logging settings; `RUST_LOG` takes precedence at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Model provider settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    /// Overrides [`ProviderKind::default_base_url`]
    pub base_url: Option<String>,
    /// Primary model identifier
    pub model: String,
    /// Ordered fallbacks tried after the primary model
    pub fallback_models: Vec<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Replaces the built-in system prompt when set
    pub system_prompt_path: Option<PathBuf>,
}

impl ProviderConfig {
    /// Configured base URL, or the provider default, without trailing slash
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            base_url: None,
            model: "openai/gpt-4o-mini".to_string(),
            fallback_models: Vec::new(),
            temperature: 0.0,
            max_tokens: 500,
            system_prompt_path: None,
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("fallback_models", &self.fallback_models)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt_path", &self.system_prompt_path)
            .finish()
    }
}

/// Admission control and queue thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Per-requester cooldown after an accepted check; 0 disables it
    pub user_cooldown_secs: u64,
    /// Accepted checks per group within the 24h window
    pub daily_group_limit: u32,
    /// Token bucket capacity per requester
    pub bucket_capacity: u32,
    /// Tokens restored per second
    pub bucket_refill_rate: f64,
    pub queue_capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            user_cooldown_secs: 30,
            daily_group_limit: 100,
            bucket_capacity: 5,
            bucket_refill_rate: 1.0,
            queue_capacity: 50,
        }
    }
}

/// Worker pool and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    /// Attempts per model before the chain advances
    pub attempts_per_model: u32,
    /// Fixed delay between attempts of the same model
    pub retry_backoff_ms: u64,
    /// Hard wall-clock ceiling per outbound model call
    pub call_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            attempts_per_model: 2,
            retry_backoff_ms: 1000,
            call_timeout_secs: 60,
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Complete verifier configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub provider: ProviderConfig,
    pub rate_limits: RateLimitConfig,
    pub workers: WorkerConfig,
    pub events: EventsConfig,
}

impl VerifierConfig {
    /// Parse configuration from TOML text; missing sections use defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve, load, override and validate the configuration
    ///
    /// An explicitly named file (CLI or env) must exist. The default
    /// location is optional: if it is missing, startup continues on
    /// compiled defaults with a warning.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            ConfigLocation::Explicit(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load_file(&path)?
            }
            ConfigLocation::Default(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load_file(&path)?
            }
            ConfigLocation::Default(path) => {
                warn!(
                    "Config file not found at {}, using compiled defaults",
                    path.display()
                );
                Self::default()
            }
            ConfigLocation::None => {
                warn!("Could not determine config directory, using compiled defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `CLAIMGUARD_BIND` and the provider API key variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(bind) = non_empty_env(BIND_ENV) {
            self.server.bind = bind;
        }

        for var in API_KEY_ENVS {
            if let Some(key) = non_empty_env(var) {
                info!("Provider API key loaded from {}", var);
                self.provider.api_key = key;
                break;
            }
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers.count == 0 {
            return Err(Error::Config("workers.count must be at least 1".to_string()));
        }
        if self.workers.attempts_per_model == 0 {
            return Err(Error::Config(
                "workers.attempts_per_model must be at least 1".to_string(),
            ));
        }
        if self.rate_limits.queue_capacity == 0 {
            return Err(Error::Config(
                "rate_limits.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.rate_limits.bucket_capacity == 0 {
            return Err(Error::Config(
                "rate_limits.bucket_capacity must be at least 1".to_string(),
            ));
        }
        let refill = self.rate_limits.bucket_refill_rate;
        if refill.is_nan() || refill < 0.0 {
            return Err(Error::Config(
                "rate_limits.bucket_refill_rate must be non-negative".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(Error::Config("provider.model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Where the config file was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named by CLI argument or environment; must exist
    Explicit(PathBuf),
    /// Platform default location; may be missing
    Default(PathBuf),
    /// No config directory on this platform
    None,
}

/// Resolve the config file location following the module priority order
pub fn resolve_config_path(cli_path: Option<&Path>) -> ConfigLocation {
    if let Some(path) = cli_path {
        return ConfigLocation::Explicit(path.to_path_buf());
    }

    if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
        return ConfigLocation::Explicit(PathBuf::from(path));
    }

    match dirs::config_dir() {
        Some(dir) => ConfigLocation::Default(dir.join("claimguard").join("config.toml")),
        None => ConfigLocation::None,
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = VerifierConfig::default();
        assert_eq!(config.rate_limits.user_cooldown_secs, 30);
        assert_eq!(config.rate_limits.daily_group_limit, 100);
        assert_eq!(config.rate_limits.bucket_capacity, 5);
        assert_eq!(config.rate_limits.bucket_refill_rate, 1.0);
        assert_eq!(config.rate_limits.queue_capacity, 50);
        assert_eq!(config.workers.count, 2);
        assert_eq!(config.workers.attempts_per_model, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = VerifierConfig::from_toml_str(
            r#"
            [provider]
            kind = "anthropic"
            model = "claude-x"
            fallback_models = ["claude-y"]

            [workers]
            count = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.kind, ProviderKind::Messages);
        assert_eq!(config.provider.model, "claude-x");
        assert_eq!(config.provider.fallback_models, vec!["claude-y".to_string()]);
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.retry_backoff_ms, 1000);
        assert_eq!(config.server.bind, "127.0.0.1:5780");
    }

    #[test]
    fn test_provider_kind_aliases() {
        for (alias, expected) in [
            ("openai", ProviderKind::ChatCompletions),
            ("openrouter", ProviderKind::ChatCompletions),
            ("custom", ProviderKind::ChatCompletions),
            ("google_ai_studio", ProviderKind::Gemini),
            ("google", ProviderKind::Gemini),
            ("anthropic", ProviderKind::Messages),
            ("messages", ProviderKind::Messages),
        ] {
            let text = format!("[provider]\nkind = \"{}\"\n", alias);
            let config = VerifierConfig::from_toml_str(&text).unwrap();
            assert_eq!(config.provider.kind, expected, "alias {}", alias);
        }
    }

    #[test]
    fn test_unknown_provider_kind_rejected() {
        let result = VerifierConfig::from_toml_str("[provider]\nkind = \"carrier-pigeon\"\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = VerifierConfig::default();
        config.workers.count = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = VerifierConfig::default();
        config.provider.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolved_base_url_strips_trailing_slash() {
        let mut provider = ProviderConfig::default();
        assert_eq!(provider.resolved_base_url(), "https://openrouter.ai/api/v1");

        provider.base_url = Some("http://localhost:8080/v1/".to_string());
        assert_eq!(provider.resolved_base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = ProviderConfig {
            api_key: "sk-secret".to_string(),
            ..ProviderConfig::default()
        };
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_unreadable_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match VerifierConfig::load_file(&path) {
            Err(Error::Config(message)) => assert!(message.contains("missing.toml")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cli_path_is_explicit() {
        let location = resolve_config_path(Some(Path::new("/tmp/some.toml")));
        assert_eq!(
            location,
            ConfigLocation::Explicit(PathBuf::from("/tmp/some.toml"))
        );
    }
}
