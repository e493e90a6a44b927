//! HTTP API handlers
//!
//! `POST /verify` submits, `GET /events` streams results, `GET /health`
//! reports queue and worker state.

pub mod health;
pub mod sse;
pub mod submit;

pub use health::health_routes;
pub use sse::event_stream;
pub use submit::submit_routes;
