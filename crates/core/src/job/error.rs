//! Error types for the job module.

use thiserror::Error;

/// Errors returned by the job registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No active (or, for lookups, completed) job with this id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the job's current state.
    #[error("Cannot {operation} job {job_id}: current state is {current_state}")]
    InvalidState {
        job_id: String,
        current_state: String,
        operation: String,
    },
}

/// A request that must be rejected before any subprocess runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one decryption key is required")]
    MissingKeys,

    #[error("Invalid decryption key: {0}")]
    InvalidKey(String),

    #[error("Invalid save name '{0}': must be a plain file name without path separators")]
    InvalidSaveName(String),

    #[error("Source URL must not be empty")]
    EmptyUrl,

    #[error("Invalid value for {field}: '{value}' looks like a command-line flag")]
    InvalidArgument { field: String, value: String },

    #[error("Argument '{0}' is managed by the service and cannot be passed through")]
    ReservedArgument(String),

    #[error("Input and output paths are the same: {0}")]
    SameInputOutput(String),
}
