//! claimguard-verifier library interface
//!
//! Source-locked claim verification: admission control, a bounded job
//! queue, a worker pool and the provider orchestration behind it. Exposed
//! as a library for integration testing and embedding.

pub mod api;
pub mod error;
pub mod models;
pub mod ports;
pub mod providers;
pub mod services;
pub mod workers;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use claimguard_common::events::EventBus;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Submitter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub submitter: Submitter,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub worker_count: usize,
    /// Cancelled on shutdown; ends long-lived streams
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        submitter: Submitter,
        event_bus: EventBus,
        worker_count: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            submitter,
            event_bus,
            startup_time: Utc::now(),
            worker_count,
            shutdown,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::submit_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
