//! Verification workers
//!
//! A fixed number of tasks pull jobs off the shared queue. Each job runs
//! retrieval, classification, model analysis, delivery and storage in that
//! order. A failure anywhere still produces an UNVERIFIABLE result, and a
//! panic inside a job never takes its worker down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use claimguard_common::text::truncate_chars;
use claimguard_common::VerificationResult;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job_queue::JobQueue;
use crate::models::VerificationJob;
use crate::ports::{Delivery, EvidenceRetrieval, Storage};
use crate::providers::ProviderOrchestrator;
use crate::services::evidence_classifier;

/// Characters of the claim sent to the search backend
pub const SEARCH_QUERY_CHARS: usize = 200;

pub const INTERNAL_ERROR_REASONING: &str = "Internal error while verifying this claim.";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs one job through the whole pipeline
pub struct JobProcessor {
    retrieval: Arc<dyn EvidenceRetrieval>,
    orchestrator: Arc<ProviderOrchestrator>,
    delivery: Arc<dyn Delivery>,
    storage: Arc<dyn Storage>,
}

impl JobProcessor {
    pub fn new(
        retrieval: Arc<dyn EvidenceRetrieval>,
        orchestrator: Arc<ProviderOrchestrator>,
        delivery: Arc<dyn Delivery>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            retrieval,
            orchestrator,
            delivery,
            storage,
        }
    }

    /// Produce a result for a job; panics become UNVERIFIABLE
    pub async fn verify(&self, job: &VerificationJob) -> VerificationResult {
        match AssertUnwindSafe(self.analyze(job)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                error!(
                    job_id = %job.job_id(),
                    panic = %panic_message(payload.as_ref()),
                    "Verification panicked"
                );
                VerificationResult::unverifiable(
                    job.claim(),
                    0.0,
                    INTERNAL_ERROR_REASONING,
                    Vec::new(),
                    self.orchestrator.chain().primary(),
                )
            }
        }
    }

    async fn analyze(&self, job: &VerificationJob) -> VerificationResult {
        let query = truncate_chars(job.claim(), SEARCH_QUERY_CHARS);
        let evidence = match self.retrieval.search(query).await {
            Ok(evidence) => evidence,
            Err(err) => {
                warn!(job_id = %job.job_id(), error = %err, "Evidence retrieval failed, continuing without sources");
                Vec::new()
            }
        };
        debug!(job_id = %job.job_id(), results = evidence.len(), "Evidence retrieved");

        let sources = evidence_classifier::build_sources(&evidence);
        self.orchestrator.analyze(job.claim(), sources).await
    }

    /// Verify, deliver, then store
    ///
    /// Storage sees the delivery receipt. A storage failure is logged and
    /// has no effect on what was delivered.
    pub async fn process(&self, job: VerificationJob) -> VerificationResult {
        let result = self.verify(&job).await;

        let receipt = match self.delivery.deliver(&job, &result).await {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                error!(job_id = %job.job_id(), error = %err, "Failed to deliver verification result");
                None
            }
        };

        if let Err(err) = self.storage.store(&job, &result, receipt.as_ref()).await {
            warn!(job_id = %job.job_id(), error = %err, "Failed to store verification result");
        }

        result
    }
}

/// Fixed-size set of worker tasks
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    token: CancellationToken,
}

impl WorkerPool {
    /// Spawn `count` workers (at least one) on the current runtime
    pub fn start(
        count: usize,
        queue: JobQueue,
        processor: Arc<JobProcessor>,
        token: CancellationToken,
    ) -> Self {
        let handles = (0..count.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    queue.clone(),
                    Arc::clone(&processor),
                    token.clone(),
                ))
            })
            .collect::<Vec<_>>();

        info!(workers = handles.len(), "Verification workers started");
        Self { handles, token }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every worker and wait for them to exit
    ///
    /// Jobs in flight are abandoned.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "Worker task ended abnormally");
            }
        }
        info!("Verification workers stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: JobQueue,
    processor: Arc<JobProcessor>,
    token: CancellationToken,
) {
    debug!(worker_id, "Worker waiting for jobs");

    loop {
        let job = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            job = queue.next() => job,
        };

        let Some(job) = job else {
            debug!(worker_id, "Queue closed");
            break;
        };

        let job_id = job.job_id();
        debug!(worker_id, %job_id, "Worker picked up job");

        let run = AssertUnwindSafe(processor.process(job)).catch_unwind();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!(worker_id, %job_id, "Shutdown requested, abandoning job in flight");
                break;
            }
            outcome = run => {
                if let Err(payload) = outcome {
                    error!(
                        worker_id,
                        %job_id,
                        panic = %panic_message(payload.as_ref()),
                        "Job panicked after verification"
                    );
                }
            }
        }
    }

    debug!(worker_id, "Worker exiting");
}
