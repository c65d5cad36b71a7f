//! Scripted process runner for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::process::{ProcessError, ProcessInvocation, ProcessOutput, ProcessRunner};

/// What a scripted tool does when it runs to exit.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExit {
    /// Exit code to report.
    pub code: i32,
    /// Files to create before exiting, relative to the working directory.
    pub files: Vec<String>,
    /// Directories to create before exiting, relative to the working directory.
    pub dirs: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// Simulated run time.
    pub delay: Duration,
}

/// Behavior of one scripted tool.
#[derive(Debug, Clone)]
pub enum ToolBehavior {
    /// Run (optionally creating files) and exit.
    Exit(ScriptedExit),
    /// Fail to start, as if the binary were missing.
    LaunchFailure,
    /// Never exit on its own; ends only by cancellation or timeout.
    Hang,
}

impl ToolBehavior {
    /// Exit 0 without producing anything.
    pub fn success() -> Self {
        Self::exit(0)
    }

    /// Exit with the given code.
    pub fn exit(code: i32) -> Self {
        Self::Exit(ScriptedExit {
            code,
            ..Default::default()
        })
    }

    /// Create a file (with a few bytes of content) before exiting.
    pub fn creating(self, name: &str) -> Self {
        self.map_exit(|exit| exit.files.push(name.to_string()))
    }

    /// Create a directory before exiting.
    pub fn creating_dir(self, name: &str) -> Self {
        self.map_exit(|exit| exit.dirs.push(name.to_string()))
    }

    pub fn with_stdout(self, stdout: &str) -> Self {
        self.map_exit(|exit| exit.stdout = stdout.to_string())
    }

    pub fn with_stderr(self, stderr: &str) -> Self {
        self.map_exit(|exit| exit.stderr = stderr.to_string())
    }

    /// Take `delay` before exiting.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.map_exit(|exit| exit.delay = delay)
    }

    fn map_exit(self, f: impl FnOnce(&mut ScriptedExit)) -> Self {
        match self {
            Self::Exit(mut exit) => {
                f(&mut exit);
                Self::Exit(exit)
            }
            other => other,
        }
    }
}

/// Mock implementation of the ProcessRunner trait.
///
/// Tools are looked up by program name. A program with no configured
/// behavior exits 0 and produces nothing.
///
/// # Example
///
/// ```rust,ignore
/// use ripline_core::testing::{ScriptedRunner, ToolBehavior};
///
/// let runner = ScriptedRunner::new();
/// runner.set_behavior("N_m3u8DL-RE", ToolBehavior::success().creating("clip.mkv")).await;
/// runner.set_behavior("ffmpeg", ToolBehavior::exit(1).with_stderr("Invalid data")).await;
///
/// // ... run a job ...
///
/// assert_eq!(runner.invocations_of("ffmpeg").await, 1);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    behaviors: Arc<RwLock<HashMap<String, ToolBehavior>>>,
    invocations: Arc<RwLock<Vec<ProcessInvocation>>>,
}

impl ScriptedRunner {
    /// Create a new scripted runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure how `program` behaves.
    pub async fn set_behavior(&self, program: &str, behavior: ToolBehavior) {
        self.behaviors
            .write()
            .await
            .insert(program.to_string(), behavior);
    }

    /// Get all recorded invocations, in call order.
    pub async fn recorded_invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations.read().await.clone()
    }

    /// Number of times `program` was run.
    pub async fn invocations_of(&self, program: &str) -> usize {
        self.invocations
            .read()
            .await
            .iter()
            .filter(|i| i.program_name() == program)
            .count()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded(&self) {
        self.invocations.write().await.clear();
    }
}

fn resolve(invocation: &ProcessInvocation, name: &str) -> PathBuf {
    match &invocation.working_dir {
        Some(dir) if !Path::new(name).is_absolute() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Sleeps for `duration` (forever if `None`) unless cancelled or timed out first.
async fn simulate_run(
    invocation: &ProcessInvocation,
    cancel: &CancellationToken,
    duration: Option<Duration>,
) -> Result<(), ProcessError> {
    let program = invocation.program_name();
    let run = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    let deadline = async {
        if invocation.timeout.is_zero() {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(invocation.timeout).await
        }
    };

    tokio::select! {
        _ = run => Ok(()),
        _ = cancel.cancelled() => Err(ProcessError::Cancelled { program }),
        _ = deadline => Err(ProcessError::TimedOut {
            program,
            timeout_secs: invocation.timeout.as_secs(),
        }),
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        self.invocations.write().await.push(invocation.clone());

        let behavior = self
            .behaviors
            .read()
            .await
            .get(&invocation.program_name())
            .cloned()
            .unwrap_or_else(ToolBehavior::success);

        match behavior {
            ToolBehavior::LaunchFailure => Err(ProcessError::launch(
                invocation.program_name(),
                format!("{} not found", invocation.program_name()),
            )),
            ToolBehavior::Hang => simulate_run(invocation, cancel, None)
                .await
                .map(|()| ProcessOutput::default()),
            ToolBehavior::Exit(exit) => {
                simulate_run(invocation, cancel, Some(exit.delay)).await?;
                for dir in &exit.dirs {
                    tokio::fs::create_dir_all(resolve(invocation, dir)).await?;
                }
                for file in &exit.files {
                    tokio::fs::write(resolve(invocation, file), b"media").await?;
                }
                Ok(ProcessOutput {
                    exit_code: Some(exit.code),
                    stdout: exit.stdout,
                    stderr: exit.stderr,
                })
            }
        }
    }
}
