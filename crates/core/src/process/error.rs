//! Error types for the process module.

use thiserror::Error;

/// Errors that prevent a process from running to exit.
///
/// A nonzero exit is not an error here; it is reported in `ProcessOutput`.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started (missing binary, permissions, bad cwd).
    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    /// The process exceeded its time limit and was killed.
    #[error("{program} timed out after {timeout_secs} seconds")]
    TimedOut { program: String, timeout_secs: u64 },

    /// The caller cancelled the run and the process was killed.
    #[error("{program} was cancelled")]
    Cancelled { program: String },

    /// I/O error while collecting output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Creates a launch error.
    pub fn launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.into(),
        }
    }
}
