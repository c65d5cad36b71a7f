//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::ValidationError;

/// Errors returned synchronously by `submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request is malformed; no job was created.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The orchestrator is shutting down and accepts no new jobs.
    #[error("Service is shutting down")]
    ShuttingDown,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// False once shutdown has begun.
    pub accepting: bool,
    /// Jobs not yet terminal.
    pub active_count: usize,
    /// Completed jobs still retained.
    pub completed_count: usize,
    /// Jobs holding a concurrency slot right now.
    pub running_count: usize,
    /// Concurrency limit (0 = unlimited).
    pub max_concurrent_jobs: usize,
}
