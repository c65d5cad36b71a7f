use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use ripline_core::{probe_tool, OrchestratorStatus, SanitizedConfig, ToolProbe};

use super::files::scan_media;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub tools: ToolsHealth,
    pub jobs: OrchestratorStatus,
    pub publisher_configured: bool,
    pub files_available: usize,
}

#[derive(Serialize)]
pub struct ToolsHealth {
    pub acquirer: ToolProbe,
    pub ffmpeg: ToolProbe,
}

/// Service information and endpoint list.
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "ripline",
        "version": VERSION,
        "status": "running",
        "endpoints": {
            "process": "POST /api/v1/process - Submit a stream for processing",
            "jobs": "GET /api/v1/jobs - List active and recently completed jobs",
            "job_status": "GET /api/v1/jobs/{id} - Get job status",
            "cancel": "DELETE /api/v1/jobs/{id} - Cancel a queued or running job",
            "files": "GET /api/v1/files - List processed files",
            "download": "GET /api/v1/download/{filename} - Download a file",
            "stream": "GET /stream/{filename} - Stream a file",
            "health": "GET /api/v1/health - Health check",
            "config": "GET /api/v1/config - Sanitized configuration",
            "metrics": "GET /metrics - Prometheus metrics",
        }
    }))
}

/// Health check with tool availability.
///
/// The service reports `ok` while it can accept requests; missing tools show up
/// under `tools` and make every job fail at launch.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = state.config();
    let (acquirer, ffmpeg) = tokio::join!(
        probe_tool(state.runner(), &config.acquirer.binary_path, &["--version"]),
        probe_tool(state.runner(), &config.converter.ffmpeg_path, &["-version"]),
    );

    let files_available = match scan_media(state.output_dir()).await {
        Ok(files) => files.len(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to scan output directory");
            0
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        tools: ToolsHealth { acquirer, ffmpeg },
        jobs: state.orchestrator().status(),
        publisher_configured: state.orchestrator().has_publisher(),
        files_available,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
