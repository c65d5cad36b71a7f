//! Tokio-based process runner.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ProcessError;
use super::types::{ProcessInvocation, ProcessOutput};

/// Runs external tools.
///
/// Implementations must kill the child when the timeout expires or the
/// token is cancelled.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the invocation to exit and captures its output.
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// `ProcessRunner` backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

async fn deadline(timeout: Duration) {
    if timeout.is_zero() {
        std::future::pending::<()>().await
    } else {
        tokio::time::sleep(timeout).await
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let program = invocation.program_name();
        debug!(program = %program, args = invocation.args.len(), "Spawning process");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                format!("{} not found", program)
            } else {
                e.to_string()
            };
            ProcessError::launch(&program, reason)
        })?;

        // Dropping the wait future drops the child, and kill_on_drop kills it.
        tokio::select! {
            output = child.wait_with_output() => Ok(ProcessOutput::from(output?)),
            _ = cancel.cancelled() => Err(ProcessError::Cancelled { program }),
            _ = deadline(invocation.timeout) => Err(ProcessError::TimedOut {
                program,
                timeout_secs: invocation.timeout.as_secs(),
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> ProcessInvocation {
        ProcessInvocation::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr_separately() {
        let runner = TokioProcessRunner::new();
        let output = runner
            .run(&sh("echo out; echo err 1>&2"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let runner = TokioProcessRunner::new();
        let output = runner
            .run(&sh("exit 3"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let runner = TokioProcessRunner::new();
        let result = runner
            .run(
                &ProcessInvocation::new("definitely-not-a-real-binary-7f3a"),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ProcessError::Launch { .. })));
    }

    #[tokio::test]
    async fn test_working_dir_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new();
        let output = runner
            .run(
                &sh("touch marker").with_working_dir(dir.path()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(output.success());
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = TokioProcessRunner::new();
        let started = Instant::now();
        let result = runner
            .run(
                &sh("sleep 30").with_timeout(Duration::from_millis(200)),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_kills_process() {
        let runner = TokioProcessRunner::new();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = runner.run(&sh("sleep 30"), &token).await;

        assert!(matches!(result, Err(ProcessError::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
