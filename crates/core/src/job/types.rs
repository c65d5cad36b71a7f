//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::converter::ContainerFormat;

/// Maximum bytes of captured tool output kept per stream in diagnostics.
///
/// The tail is kept because tools report the fatal error last.
pub const DIAGNOSTIC_TAIL_BYTES: usize = 16 * 1024;

// ============================================================================
// Request
// ============================================================================

/// Immutable snapshot of a submitted acquisition request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRequest {
    /// Manifest address (MPD/M3U8).
    pub url: String,

    /// Output file stem, without extension.
    pub save_name: String,

    /// Decryption keys, one `--key` argument each.
    #[serde(default)]
    pub keys: Vec<String>,

    /// Video track selector.
    #[serde(default = "default_select_video")]
    pub select_video: String,

    /// Audio track selector.
    #[serde(default = "default_select_all")]
    pub select_audio: String,

    /// Subtitle track selector.
    #[serde(default = "default_select_all")]
    pub select_subtitle: String,

    /// Container the acquisition tool muxes into.
    #[serde(default)]
    pub format: ContainerFormat,

    /// Acquisition tool log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ask the acquisition tool to binary-merge segments.
    #[serde(default)]
    pub binary_merge: bool,

    /// Extra flags passed through to the acquisition tool.
    #[serde(default)]
    pub additional_args: Vec<String>,
}

fn default_select_video() -> String {
    "best".to_string()
}

fn default_select_all() -> String {
    "all".to_string()
}

fn default_log_level() -> String {
    "Debug".to_string()
}

impl JobRequest {
    /// Create a request with default track selection and format.
    pub fn new(url: impl Into<String>, save_name: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            url: url.into(),
            save_name: save_name.into(),
            keys,
            select_video: default_select_video(),
            select_audio: default_select_all(),
            select_subtitle: default_select_all(),
            format: ContainerFormat::default(),
            log_level: default_log_level(),
            binary_merge: false,
            additional_args: Vec::new(),
        }
    }

    /// Set the output container.
    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable binary merge.
    pub fn with_binary_merge(mut self, enabled: bool) -> Self {
        self.binary_merge = enabled;
        self
    }

    /// Add pass-through arguments.
    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }

    /// Returns true if at least one non-blank key was supplied.
    pub fn has_keys(&self) -> bool {
        self.keys.iter().any(|k| !k.trim().is_empty())
    }

    /// Filename the acquisition tool is expected to produce.
    pub fn expected_filename(&self) -> String {
        format!("{}.{}", self.save_name, self.format.extension())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Current state of a job.
///
/// State machine flow:
/// ```text
/// Queued -> Validating -> Acquiring -> Converting -> Publishing -> Completed
///
/// Any non-terminal state can transition to Error.
/// Queued, Acquiring and Converting can transition to Cancelled.
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Validating,
    Acquiring,
    Converting,
    Publishing,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Returns true if the job can be cancelled from this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            JobStatus::Queued | JobStatus::Acquiring | JobStatus::Converting
        )
    }

    /// Returns the state as a string (for filtering and metrics labels).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Validating => "validating",
            JobStatus::Acquiring => "acquiring",
            JobStatus::Converting => "converting",
            JobStatus::Publishing => "publishing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Results and diagnostics
// ============================================================================

/// The single file considered authoritative for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactDescriptor {
    /// File name inside the output directory.
    pub filename: String,
    /// Size on disk.
    pub size_bytes: u64,
    /// Container of the file.
    pub format: ContainerFormat,
    /// Whether the file is the remuxed output rather than the acquired one.
    pub converted: bool,
}

impl ArtifactDescriptor {
    /// Size in MiB rounded to two decimals.
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

/// Shareable reference returned by the publication client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicationReference {
    pub link: String,
    pub published_at: DateTime<Utc>,
}

impl PublicationReference {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            published_at: Utc::now(),
        }
    }
}

/// Category of the error recorded on a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// Request rejected before any subprocess ran.
    Validation,
    /// A tool could not be started.
    LaunchFailure,
    /// A tool ran and failed (nonzero exit or timeout).
    StageFailure,
    /// A tool exited 0 but its output file is absent.
    ArtifactMissing,
    /// The publication client failed.
    PublishError,
    /// Cancelled by request or shutdown.
    Cancelled,
}

/// Free-form diagnostics captured along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<JobErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Non-fatal: conversion failed and the acquired file was kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_error: Option<String>,
    /// Non-fatal: publication failed, the local artifact is still usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,
}

/// Keep the last `max_bytes` of a captured stream, cut on a char boundary.
pub fn output_tail(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut start = output.len() - max_bytes;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    output[start..].to_string()
}

// ============================================================================
// Record
// ============================================================================

/// A job tracked from submission to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    /// Unique identifier (UUID).
    pub id: String,

    /// Current state.
    pub status: JobStatus,

    /// Submitted parameters.
    pub request: JobRequest,

    pub started_at: DateTime<Utc>,

    /// Set once the job reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Final artifact, once acquisition produced a usable file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactDescriptor>,

    /// Set only when publication succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<PublicationReference>,

    #[serde(default)]
    pub diagnostics: Diagnostics,

    /// Acquisition command line with key material redacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl JobRecord {
    /// Create a queued record for a request.
    pub fn new(id: impl Into<String>, request: JobRequest) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            request,
            started_at: Utc::now(),
            completed_at: None,
            artifact: None,
            publication: None,
            diagnostics: Diagnostics::default(),
            command: None,
        }
    }

    /// Record a fatal failure.
    pub fn fail(&mut self, kind: JobErrorKind, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.diagnostics.error = Some(message.into());
        self.diagnostics.error_kind = Some(kind);
    }

    /// Attach captured tool output, keeping only the tail of each stream.
    pub fn capture_output(&mut self, stderr: &str, stdout: &str) {
        if !stderr.is_empty() {
            self.diagnostics.stderr = Some(output_tail(stderr, DIAGNOSTIC_TAIL_BYTES));
        }
        if !stdout.is_empty() {
            self.diagnostics.stdout = Some(output_tail(stdout, DIAGNOSTIC_TAIL_BYTES));
        }
    }
}
