//! Error types for the publisher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing an artifact.
///
/// None of these fail a job; they end up in the job's diagnostics.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Upload endpoint or token not configured.
    #[error("Publisher credentials are not configured")]
    MissingCredentials,

    /// Artifact could not be opened for upload.
    #[error("Cannot read {path}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    /// Transport-level failure.
    #[error("Upload request failed: {0}")]
    Request(String),

    /// Remote store answered with a non-success status.
    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Remote store answered without a usable link.
    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),

    /// Upload did not finish in time.
    #[error("Upload timed out after {timeout_secs} seconds")]
    TimedOut { timeout_secs: u64 },

    /// Upload abandoned because the service is shutting down.
    #[error("Upload interrupted by shutdown")]
    Interrupted,
}
