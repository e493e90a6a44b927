//! Submission endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{JobRequest, VerificationJob};
use crate::services::{SubmitError, SubmitOutcome};
use crate::AppState;

/// Body of every `POST /verify` answer that is not a 400
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            accepted: outcome.accepted,
            job_id: outcome.job_id,
            reason: (!outcome.reason.is_empty()).then_some(outcome.reason),
        }
    }
}

fn status_for(result: &Result<Uuid, SubmitError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::ACCEPTED,
        Err(SubmitError::AdmissionRejected(_)) => StatusCode::TOO_MANY_REQUESTS,
        Err(SubmitError::QueueFull) | Err(SubmitError::QueueClosed) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// POST /verify
///
/// Queues a claim for verification and returns at once. The result is
/// published on `/events` when a worker finishes.
///
/// - 202: accepted, body carries `job_id`
/// - 429: refused by admission control, body carries `reason`
/// - 503: queue full or shutting down
/// - 400: malformed body or empty claim
pub async fn submit_claim(
    State(state): State<AppState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(request) = payload?;
    let job = VerificationJob::new(request)?;

    let result = state.submitter.submit(job);
    let status = status_for(&result);
    Ok((status, Json(SubmitOutcome::from(&result).into())))
}

/// Build submission routes
pub fn submit_routes() -> Router<AppState> {
    Router::new().route("/verify", post(submit_claim))
}
