//! Job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ripline_core::{ContainerFormat, JobRecord, JobRequest, JobStatus, RegistryError, SubmitError};
use tracing::info;

use super::files::stream_url;
use super::ErrorResponse;
use crate::state::AppState;

/// Default number of completed jobs returned by the list endpoint
const DEFAULT_COMPLETED_LIMIT: usize = 20;

/// Maximum allowed limit for completed job queries
const MAX_COMPLETED_LIMIT: usize = 1000;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job.
///
/// Accepts a single `key`, a `keys` list, or both.
#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    pub url: String,
    pub save_name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub format: ContainerFormat,
    pub select_video: Option<String>,
    pub select_audio: Option<String>,
    pub select_subtitle: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub binary_merge: bool,
    #[serde(default)]
    pub additional_args: Vec<String>,
}

impl ProcessBody {
    /// Build the job request, putting the single `key` first and dropping duplicates.
    pub fn into_request(self) -> JobRequest {
        let mut keys: Vec<String> = Vec::with_capacity(self.keys.len() + 1);
        for key in self.key.into_iter().chain(self.keys) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut request = JobRequest::new(self.url, self.save_name, keys)
            .with_format(self.format)
            .with_binary_merge(self.binary_merge)
            .with_additional_args(self.additional_args);

        if let Some(select_video) = self.select_video {
            request.select_video = select_video;
        }
        if let Some(select_audio) = self.select_audio {
            request.select_audio = select_audio;
        }
        if let Some(select_subtitle) = self.select_subtitle {
            request.select_subtitle = select_subtitle;
        }
        if let Some(log_level) = self.log_level {
            request.log_level = log_level;
        }
        request
    }
}

/// Response for an accepted submission
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
    pub check_status: String,
    pub estimated_filename: String,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Maximum number of completed jobs to return
    pub limit: Option<usize>,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub active: Vec<JobRecord>,
    pub completed: Vec<JobRecord>,
}

/// A job record plus where its artifact can be streamed from
#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: JobRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

impl From<JobRecord> for JobResponse {
    fn from(job: JobRecord) -> Self {
        let stream_url = job.artifact.as_ref().map(|a| stream_url(&a.filename));
        Self { job, stream_url }
    }
}

/// Response for a cancelled job
#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub message: String,
    pub job: JobRecord,
}

fn registry_error(e: RegistryError) -> ApiError {
    let status = match &e {
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::InvalidState { .. } => StatusCode::CONFLICT,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a stream for acquisition
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProcessBody>,
) -> Result<(StatusCode, Json<ProcessResponse>), ApiError> {
    let request = body.into_request();

    match state.orchestrator().submit(request) {
        Ok(record) => {
            info!(job_id = %record.id, url = %record.request.url, "Accepted job via API");
            Ok((
                StatusCode::ACCEPTED,
                Json(ProcessResponse {
                    check_status: format!("/api/v1/jobs/{}", record.id),
                    estimated_filename: record.request.expected_filename(),
                    job_id: record.id,
                    status: JobStatus::Queued,
                    message: "Processing started".to_string(),
                }),
            ))
        }
        Err(e @ SubmitError::Validation(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.to_string())),
        )),
        Err(e @ SubmitError::ShuttingDown) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(e.to_string())),
        )),
    }
}

/// List active jobs and the most recent completed ones
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Json<ListJobsResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_COMPLETED_LIMIT)
        .min(MAX_COMPLETED_LIMIT);

    let orchestrator = state.orchestrator();
    Json(ListJobsResponse {
        active: orchestrator.list_active(),
        completed: orchestrator.list_completed(limit),
    })
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    state
        .orchestrator()
        .get(&id)
        .map(|job| Json(JobResponse::from(job)))
        .map_err(registry_error)
}

/// Cancel a queued or running job
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancelJobResponse>, ApiError> {
    let job = state.orchestrator().cancel(&id).map_err(registry_error)?;
    Ok(Json(CancelJobResponse {
        message: format!("Job {} cancelled", id),
        job,
    }))
}
