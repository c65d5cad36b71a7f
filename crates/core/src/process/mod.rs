//! Running external tools as subprocesses.
//!
//! The acquisition and conversion tools are opaque: they are judged only by
//! exit status and the files they leave behind. `ProcessRunner` is the seam
//! the orchestrator uses so tests can script tool behavior.

mod error;
mod probe;
mod runner;
mod types;

pub use error::ProcessError;
pub use probe::{probe_tool, ToolProbe, ToolStatus};
pub use runner::{ProcessRunner, TokioProcessRunner};
pub use types::{ProcessInvocation, ProcessOutput};
