//! Job orchestrator implementation.
//!
//! Each submitted job runs as its own task:
//! - Waits for a concurrency slot (cancellable while queued)
//! - Acquisition: fatal on failure
//! - Conversion: falls back to the acquired file on failure
//! - Publication: failure is recorded, the job still completes

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::acquirer::{AcquirerConfig, AcquisitionCommand};
use crate::converter::{ContainerFormat, ConverterConfig, RemuxCommand};
use crate::job::{
    ArtifactDescriptor, JobErrorKind, JobRecord, JobRegistry, JobRequest, JobStatus,
    RegistryError, ValidationError,
};
use crate::metrics;
use crate::process::{ProcessError, ProcessOutput, ProcessRunner};
use crate::publisher::{PublishError, Publisher};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorStatus, SubmitError};

/// How long `shutdown` waits for job tasks to observe cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Message recorded when conversion fails without stderr.
const CONVERSION_FAILED: &str = "FFmpeg conversion failed";

/// Why a job task stopped before reaching a terminal state on its own.
#[derive(Debug)]
enum Interrupt {
    /// The job was cancelled (by request or shutdown) or removed from the
    /// active partition under us.
    Cancelled,
}

impl From<RegistryError> for Interrupt {
    fn from(_: RegistryError) -> Self {
        // The only writer besides the job's own task is `cancel`.
        Interrupt::Cancelled
    }
}

/// A fatal stage failure to record on the job.
struct Failure {
    kind: JobErrorKind,
    message: String,
    output: Option<ProcessOutput>,
}

impl Failure {
    fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            output: None,
        }
    }

    fn with_output(mut self, output: ProcessOutput) -> Self {
        self.output = Some(output);
        self
    }
}

/// Shared, immutable pieces every job task needs.
struct Pipeline {
    registry: Arc<JobRegistry>,
    runner: Arc<dyn ProcessRunner>,
    publisher: Option<Arc<dyn Publisher>>,
    acquirer: AcquirerConfig,
    converter: ConverterConfig,
    output_dir: PathBuf,
    publish_timeout: Duration,
}

/// The job orchestrator - accepts requests and drives each job to a terminal state.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    pipeline: Arc<Pipeline>,
    limiter: Option<Arc<Semaphore>>,
    cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        runner: Arc<dyn ProcessRunner>,
        publisher: Option<Arc<dyn Publisher>>,
        acquirer: AcquirerConfig,
        converter: ConverterConfig,
        output_dir: PathBuf,
    ) -> Self {
        let limiter = match config.max_concurrent_jobs {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        let pipeline = Pipeline {
            registry: Arc::new(JobRegistry::new(config.completed_retention)),
            runner,
            publisher,
            acquirer,
            converter,
            output_dir,
            publish_timeout: config.publish_timeout(),
        };

        Self {
            config,
            pipeline: Arc::new(pipeline),
            limiter,
            cancellations: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// The registry holding every job this orchestrator created.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.pipeline.registry
    }

    /// Directory acquired and converted files are written to.
    pub fn output_dir(&self) -> &Path {
        &self.pipeline.output_dir
    }

    /// Whether a publication client is configured.
    pub fn has_publisher(&self) -> bool {
        self.pipeline.publisher.is_some()
    }

    /// Validate a request, create its job and start it in the background.
    ///
    /// Returns the queued record; the job runs concurrently with the caller.
    pub fn submit(&self, request: JobRequest) -> Result<JobRecord, SubmitError> {
        if self.shutdown.is_cancelled() {
            metrics::JOBS_REJECTED
                .with_label_values(&["shutting_down"])
                .inc();
            return Err(SubmitError::ShuttingDown);
        }

        if let Err(e) = validate_request(&request, &self.pipeline.acquirer) {
            metrics::JOBS_REJECTED.with_label_values(&["validation"]).inc();
            debug!(save_name = %request.save_name, error = %e, "Rejected submission");
            return Err(e.into());
        }

        let record = self.pipeline.registry.create(request);
        let token = self.shutdown.child_token();
        lock(&self.cancellations).insert(record.id.clone(), token.clone());

        metrics::JOBS_SUBMITTED.inc();
        info!(
            job_id = %record.id,
            save_name = %record.request.save_name,
            format = %record.request.format,
            "Job queued"
        );

        let task = JobTask {
            job_id: record.id.clone(),
            pipeline: Arc::clone(&self.pipeline),
            limiter: self.limiter.clone(),
            cancellations: Arc::clone(&self.cancellations),
            token,
        };
        self.tasks.spawn(task.run());

        Ok(record)
    }

    /// Cancel a job.
    ///
    /// The registry marks the record first; then any running subprocess is
    /// killed and the task stops at its next stage boundary.
    pub fn cancel(&self, id: &str) -> Result<JobRecord, RegistryError> {
        let record = self.pipeline.registry.cancel(id)?;
        if let Some(token) = lock(&self.cancellations).get(id) {
            token.cancel();
        }
        info!(job_id = %id, "Job cancelled");
        Ok(record)
    }

    /// Look up a job in either partition.
    pub fn get(&self, id: &str) -> Result<JobRecord, RegistryError> {
        self.pipeline.registry.get(id)
    }

    /// Non-terminal jobs, oldest first.
    pub fn list_active(&self) -> Vec<JobRecord> {
        self.pipeline.registry.list_active()
    }

    /// Terminal jobs, most recently completed first.
    pub fn list_completed(&self, limit: usize) -> Vec<JobRecord> {
        self.pipeline.registry.list_completed(limit)
    }

    /// Number of (active, completed) jobs.
    pub fn counts(&self) -> (usize, usize) {
        self.pipeline.registry.counts()
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let active = self.pipeline.registry.list_active();
        let (_, completed_count) = self.pipeline.registry.counts();
        OrchestratorStatus {
            accepting: !self.shutdown.is_cancelled(),
            active_count: active.len(),
            completed_count,
            running_count: active
                .iter()
                .filter(|r| r.status != JobStatus::Queued)
                .count(),
            max_concurrent_jobs: self.config.max_concurrent_jobs,
        }
    }

    /// Stop accepting jobs, cancel everything in flight and wait briefly for
    /// the tasks to finish.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            warn!("Orchestrator already shut down");
            return;
        }

        info!("Stopping job orchestrator");
        self.shutdown.cancel();
        self.tasks.close();

        if tokio::time::timeout(SHUTDOWN_GRACE, self.tasks.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tasks.len(),
                "Job tasks still running after shutdown grace period"
            );
        }

        info!("Job orchestrator stopped");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Checks everything that can be checked before a record exists.
fn validate_request(request: &JobRequest, acquirer: &AcquirerConfig) -> Result<(), ValidationError> {
    if !request.has_keys() {
        return Err(ValidationError::MissingKeys);
    }
    AcquisitionCommand::new(request, acquirer)?;
    Ok(())
}

/// Awaits `future`, giving up after `timeout` unless it is zero.
async fn with_deadline<F: Future>(timeout: Duration, future: F) -> Option<F::Output> {
    if timeout.is_zero() {
        Some(future.await)
    } else {
        tokio::time::timeout(timeout, future).await.ok()
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn observe_stage(stage: &str, result: &str, started: Instant) {
    metrics::STAGE_DURATION
        .with_label_values(&[stage, result])
        .observe(started.elapsed().as_secs_f64());
}

// =============================================================================
// Per-job task
// =============================================================================

struct JobTask {
    job_id: String,
    pipeline: Arc<Pipeline>,
    limiter: Option<Arc<Semaphore>>,
    cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
    token: CancellationToken,
}

impl JobTask {
    async fn run(self) {
        let outcome = self.run_with_permit().await;

        match outcome {
            Ok(record) => {
                metrics::JOBS_FINISHED
                    .with_label_values(&[record.status.as_str()])
                    .inc();
            }
            Err(Interrupt::Cancelled) => {
                self.finish_cancelled();
                metrics::JOBS_FINISHED.with_label_values(&["cancelled"]).inc();
            }
        }

        lock(&self.cancellations).remove(&self.job_id);
    }

    async fn run_with_permit(&self) -> Result<JobRecord, Interrupt> {
        let _permit = match &self.limiter {
            Some(limiter) => {
                let permit = tokio::select! {
                    permit = Arc::clone(limiter).acquire_owned() => permit,
                    _ = self.token.cancelled() => return Err(Interrupt::Cancelled),
                };
                // A closed semaphore only happens if it was dropped; treat as cancelled.
                Some(permit.map_err(|_| Interrupt::Cancelled)?)
            }
            None => None,
        };

        self.drive().await
    }

    /// Records a cancellation the registry has not seen yet (shutdown).
    fn finish_cancelled(&self) {
        let result = self.pipeline.registry.finalize(&self.job_id, |record| {
            let previous = record.status;
            record.status = JobStatus::Cancelled;
            record.diagnostics.error = Some(format!("Cancelled by shutdown while {}", previous));
            record.diagnostics.error_kind = Some(JobErrorKind::Cancelled);
        });
        if result.is_ok() {
            info!(job_id = %self.job_id, "Job cancelled by shutdown");
        }
    }

    fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.token.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        Ok(())
    }

    fn transition(&self, status: JobStatus) -> Result<JobRecord, Interrupt> {
        self.checkpoint()?;
        let record = self
            .pipeline
            .registry
            .update(&self.job_id, |r| r.status = status)?;
        info!(job_id = %self.job_id, status = %status, "Job state changed");
        Ok(record)
    }

    fn fail(&self, failure: Failure) -> Result<JobRecord, Interrupt> {
        error!(
            job_id = %self.job_id,
            kind = ?failure.kind,
            error = %failure.message,
            "Job failed"
        );
        let record = self.pipeline.registry.finalize(&self.job_id, |record| {
            record.fail(failure.kind, failure.message);
            if let Some(output) = &failure.output {
                record.capture_output(&output.stderr, &output.stdout);
            }
        })?;
        Ok(record)
    }

    /// Runs the state machine. Stage failures end the job in `error` and are
    /// returned as `Ok`; only cancellation is an `Err`.
    async fn drive(&self) -> Result<JobRecord, Interrupt> {
        let record = self.transition(JobStatus::Validating)?;

        // Records created through `submit` were validated already.
        if !record.request.has_keys() {
            return self.fail(Failure::new(
                JobErrorKind::Validation,
                ValidationError::MissingKeys.to_string(),
            ));
        }
        let command = match AcquisitionCommand::new(&record.request, &self.pipeline.acquirer) {
            Ok(command) => command,
            Err(e) => return self.fail(Failure::new(JobErrorKind::Validation, e.to_string())),
        };

        let acquired = match self.acquire(&command).await? {
            Ok(path) => path,
            Err(failure) => return self.fail(failure),
        };

        let (final_path, format, converted) = if command.format().is_broadly_compatible() {
            debug!(job_id = %self.job_id, "Acquired container needs no conversion");
            (acquired, command.format(), false)
        } else {
            self.transition(JobStatus::Converting)?;
            let target = self
                .pipeline
                .output_dir
                .join(format!("{}.{}", command.save_name(), ContainerFormat::Mp4.extension()));
            match self.convert(&acquired, &target).await? {
                Ok(()) => (target, ContainerFormat::Mp4, true),
                Err(reason) => {
                    metrics::CONVERSION_FALLBACKS.inc();
                    warn!(
                        job_id = %self.job_id,
                        error = %reason,
                        "Conversion failed, keeping acquired file"
                    );
                    self.pipeline.registry.update(&self.job_id, |r| {
                        r.diagnostics.conversion_error = Some(reason);
                    })?;
                    (acquired, command.format(), false)
                }
            }
        };

        let artifact = match self.describe(&final_path, format, converted).await {
            Ok(artifact) => artifact,
            Err(failure) => return self.fail(failure),
        };
        self.pipeline
            .registry
            .update(&self.job_id, |r| r.artifact = Some(artifact.clone()))?;

        let mut publication = None;
        let mut publish_error = None;
        if let (ContainerFormat::Mp4, Some(publisher)) = (format, &self.pipeline.publisher) {
            self.transition(JobStatus::Publishing)?;
            match self.publish(publisher.as_ref(), &final_path).await {
                Ok(reference) => publication = Some(reference),
                Err(e) => {
                    warn!(job_id = %self.job_id, error = %e, "Publication failed");
                    publish_error = Some(e.to_string());
                }
            }
        }

        let record = self.pipeline.registry.finalize(&self.job_id, |r| {
            r.status = JobStatus::Completed;
            r.publication = publication;
            r.diagnostics.publish_error = publish_error;
        })?;
        info!(
            job_id = %self.job_id,
            file = %artifact.filename,
            size_mb = artifact.size_mb(),
            converted,
            published = record.publication.is_some(),
            "Job completed"
        );
        Ok(record)
    }

    /// Runs the acquisition tool. The outer error is cancellation; the inner
    /// one a fatal stage failure.
    async fn acquire(
        &self,
        command: &AcquisitionCommand,
    ) -> Result<Result<PathBuf, Failure>, Interrupt> {
        let redacted = command.redacted(&self.pipeline.acquirer);
        // Validating is not cancellable, so leave it before honouring the token.
        self.pipeline.registry.update(&self.job_id, |r| {
            r.status = JobStatus::Acquiring;
            r.command = Some(redacted.clone());
        })?;
        info!(job_id = %self.job_id, status = %JobStatus::Acquiring, "Job state changed");
        self.checkpoint()?;
        debug!(job_id = %self.job_id, command = %redacted, "Running acquisition");

        let output_dir = &self.pipeline.output_dir;
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            return Ok(Err(Failure::new(
                JobErrorKind::LaunchFailure,
                format!("Cannot create output directory {}: {}", output_dir.display(), e),
            )));
        }

        let started = Instant::now();
        let invocation = command.invocation(&self.pipeline.acquirer, output_dir);
        let output = match self.pipeline.runner.run(&invocation, &self.token).await {
            Ok(output) => output,
            Err(ProcessError::Cancelled { .. }) => {
                observe_stage("acquisition", "cancelled", started);
                return Err(Interrupt::Cancelled);
            }
            Err(e @ ProcessError::Launch { .. }) => {
                observe_stage("acquisition", "failed", started);
                return Ok(Err(Failure::new(JobErrorKind::LaunchFailure, e.to_string())));
            }
            Err(e) => {
                observe_stage("acquisition", "failed", started);
                return Ok(Err(Failure::new(JobErrorKind::StageFailure, e.to_string())));
            }
        };

        if !output.success() {
            observe_stage("acquisition", "failed", started);
            let message = output.failure_message();
            return Ok(Err(
                Failure::new(JobErrorKind::StageFailure, message).with_output(output)
            ));
        }

        let acquired = command.expected_output(output_dir);
        if !path_exists(&acquired).await {
            observe_stage("acquisition", "failed", started);
            return Ok(Err(Failure::new(
                JobErrorKind::ArtifactMissing,
                "Output file not found",
            )
            .with_output(output)));
        }

        observe_stage("acquisition", "success", started);
        info!(job_id = %self.job_id, file = %acquired.display(), "Acquisition finished");
        Ok(Ok(acquired))
    }

    /// Remuxes `input` into `output` and removes `input`. The inner error is
    /// the reason to record when falling back to `input`.
    async fn convert(&self, input: &Path, output: &Path) -> Result<Result<(), String>, Interrupt> {
        let command = match RemuxCommand::new(input, output) {
            Ok(command) => command,
            Err(e) => return Ok(Err(e.to_string())),
        };

        let started = Instant::now();
        let invocation = command
            .invocation(&self.pipeline.converter)
            .with_working_dir(&self.pipeline.output_dir);
        let result = match self.pipeline.runner.run(&invocation, &self.token).await {
            Ok(out) if out.success() => {
                if path_exists(output).await {
                    Ok(())
                } else {
                    Err(CONVERSION_FAILED.to_string())
                }
            }
            Ok(out) if out.stderr.trim().is_empty() => Err(CONVERSION_FAILED.to_string()),
            Ok(out) => Err(out.stderr),
            Err(ProcessError::Cancelled { .. }) => {
                observe_stage("conversion", "cancelled", started);
                return Err(Interrupt::Cancelled);
            }
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = result {
            observe_stage("conversion", "failed", started);
            return Ok(Err(crate::job::output_tail(
                &reason,
                crate::job::DIAGNOSTIC_TAIL_BYTES,
            )));
        }

        if let Err(e) = tokio::fs::remove_file(input).await {
            observe_stage("conversion", "failed", started);
            return Ok(Err(format!(
                "Failed to remove intermediate file {}: {}",
                input.display(),
                e
            )));
        }

        observe_stage("conversion", "success", started);
        info!(job_id = %self.job_id, file = %output.display(), "Conversion finished");
        Ok(Ok(()))
    }

    async fn describe(
        &self,
        path: &Path,
        format: ContainerFormat,
        converted: bool,
    ) -> Result<ArtifactDescriptor, Failure> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            Failure::new(
                JobErrorKind::ArtifactMissing,
                format!("Output file not found: {}", e),
            )
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(ArtifactDescriptor {
            filename,
            size_bytes: metadata.len(),
            format,
            converted,
        })
    }

    async fn publish(
        &self,
        publisher: &dyn Publisher,
        path: &Path,
    ) -> Result<crate::job::PublicationReference, PublishError> {
        let started = Instant::now();
        let timeout = self.pipeline.publish_timeout;
        debug!(job_id = %self.job_id, publisher = publisher.name(), "Publishing artifact");

        let result = tokio::select! {
            result = with_deadline(timeout, publisher.publish(path)) => result,
            // Publishing cannot be cancelled; the artifact is already final.
            _ = self.token.cancelled() => {
                observe_stage("publication", "cancelled", started);
                return Err(PublishError::Interrupted);
            }
        };

        let result = result.unwrap_or(Err(PublishError::TimedOut {
            timeout_secs: timeout.as_secs(),
        }));
        let label = if result.is_ok() { "success" } else { "failed" };
        observe_stage("publication", label, started);
        metrics::PUBLISH_ATTEMPTS.with_label_values(&[label]).inc();
        result
    }
}
