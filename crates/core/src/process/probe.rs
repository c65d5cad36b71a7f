//! Tool availability checks.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::runner::ProcessRunner;
use super::types::ProcessInvocation;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Availability of an external tool.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// The version probe exited 0.
    Available,
    /// The tool started but the probe failed.
    Error,
    /// The tool could not be started.
    Unavailable,
}

/// Result of probing a tool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolProbe {
    pub status: ToolStatus,
    /// Resolved location on `PATH`, when the program is a bare name found there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// First line of the version output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Runs `<program> <args>` briefly and reports whether the tool is usable.
pub async fn probe_tool(runner: &dyn ProcessRunner, program: &Path, args: &[&str]) -> ToolProbe {
    let invocation = ProcessInvocation::new(program)
        .with_args(args.iter().copied())
        .with_timeout(PROBE_TIMEOUT);
    let path = which::which(program).ok();

    match runner.run(&invocation, &CancellationToken::new()).await {
        Ok(output) if output.success() => ToolProbe {
            status: ToolStatus::Available,
            path,
            version: output
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string),
        },
        Ok(_) | Err(crate::process::ProcessError::TimedOut { .. }) => ToolProbe {
            status: ToolStatus::Error,
            path,
            version: None,
        },
        Err(_) => ToolProbe {
            status: ToolStatus::Unavailable,
            path,
            version: None,
        },
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::TokioProcessRunner;

    #[tokio::test]
    async fn test_probe_available_tool() {
        let runner = TokioProcessRunner::new();
        let probe = probe_tool(&runner, Path::new("sh"), &["-c", "echo 'tool 1.2.3'"]).await;
        assert_eq!(probe.status, ToolStatus::Available);
        assert_eq!(probe.version.as_deref(), Some("tool 1.2.3"));
        assert!(probe.path.is_some());
    }

    #[tokio::test]
    async fn test_probe_failing_tool() {
        let runner = TokioProcessRunner::new();
        let probe = probe_tool(&runner, Path::new("sh"), &["-c", "exit 1"]).await;
        assert_eq!(probe.status, ToolStatus::Error);
    }

    #[tokio::test]
    async fn test_probe_missing_tool() {
        let runner = TokioProcessRunner::new();
        let probe = probe_tool(&runner, Path::new("missing-tool-9c2e"), &["--version"]).await;
        assert_eq!(probe.status, ToolStatus::Unavailable);
        assert!(probe.path.is_none());
    }
}
