//! claimguard-verifier - claim verification service
//!
//! Accepts claims over HTTP, checks them against retrieved evidence with a
//! chain of language models and publishes results on an SSE stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use claimguard_common::config::VerifierConfig;
use claimguard_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

use claimguard_verifier::ports::{DisabledRetrieval, DiscardStorage, EventBusDelivery};
use claimguard_verifier::providers::orchestrator::OrchestratorSettings;
use claimguard_verifier::providers::prompt::DEFAULT_SYSTEM_PROMPT;
use claimguard_verifier::providers::{ModelChain, Provider, ProviderOrchestrator};
use claimguard_verifier::services::{AdmissionController, Submitter};
use claimguard_verifier::workers::{JobProcessor, JobQueue, WorkerPool};
use claimguard_verifier::AppState;

/// Command-line arguments for claimguard-verifier
#[derive(Parser, Debug)]
#[command(name = "claimguard-verifier")]
#[command(about = "Source-locked claim verification service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides [server].bind
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; RUST_LOG wins over the configured level
    let from_env = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let env_override = from_env.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        from_env.unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting claimguard-verifier");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config =
        VerifierConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    if !env_override {
        let level = tracing_subscriber::EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid logging.level {:?}", config.logging.level))?;
        filter_handle
            .reload(level)
            .context("Failed to apply logging level")?;
    }

    if config.provider.api_key.is_empty() {
        warn!("No API key configured, model calls will likely be rejected");
    }

    let system_prompt = match &config.provider.system_prompt_path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt {}", path.display()))?,
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    };

    let settings = OrchestratorSettings::from_config(&config.provider, &config.workers);
    let provider = Provider::from_config(&config.provider, settings.call_timeout)
        .context("Failed to create model provider")?;
    let chain = ModelChain::new(&config.provider.model, &config.provider.fallback_models);
    info!(
        provider = ?provider.kind(),
        models = ?chain.models(),
        "Model provider initialized"
    );
    let orchestrator = Arc::new(ProviderOrchestrator::new(
        Arc::new(provider),
        chain,
        system_prompt,
        settings,
    ));

    let event_bus = EventBus::new(config.events.capacity);
    let queue = JobQueue::new(config.rate_limits.queue_capacity);
    let admission = Arc::new(AdmissionController::new(config.rate_limits.clone()));
    let submitter = Submitter::new(admission, queue.clone(), event_bus.clone());

    // Search and persistence are external; the defaults are inert
    let processor = Arc::new(JobProcessor::new(
        Arc::new(DisabledRetrieval),
        orchestrator,
        Arc::new(EventBusDelivery::new(event_bus.clone())),
        Arc::new(DiscardStorage),
    ));

    let token = CancellationToken::new();
    let pool = WorkerPool::start(config.workers.count, queue.clone(), processor, token.clone());

    let state = AppState::new(submitter, event_bus, pool.len(), token.clone());
    let app = claimguard_verifier::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;
    info!("Listening on http://{}", config.server.bind);
    info!("Health check: http://{}/health", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(token))
        .await
        .context("Server error")?;

    queue.close();
    pool.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Cancels `token` so workers and event streams stop with the server.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    token.cancel();
}
