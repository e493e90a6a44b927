//! Job queue and worker pool

pub mod job_queue;
pub mod worker_pool;

pub use job_queue::{JobQueue, QueueError};
pub use worker_pool::{JobProcessor, WorkerPool};
