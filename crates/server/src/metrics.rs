//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the ripline server:
//! - HTTP request metrics (latency, counts, errors)
//! - Job registry and orchestrator status (collected dynamically)
//! - Core job metrics, registered from `ripline_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ripline_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ripline_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ripline_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics (collected dynamically)
// =============================================================================

/// Jobs by registry partition.
pub static JOBS_BY_PARTITION: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("ripline_jobs", "Current job count by registry partition"),
        &["partition"], // "active", "completed"
    )
    .unwrap()
});

/// Jobs holding a concurrency slot.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ripline_jobs_running",
        "Number of jobs currently running a stage",
    )
    .unwrap()
});

/// Whether new submissions are accepted (1) or shutdown has begun (0).
pub static ORCHESTRATOR_ACCEPTING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ripline_orchestrator_accepting",
        "Whether the orchestrator accepts new jobs (1) or is shutting down (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Jobs
    registry
        .register(Box::new(JOBS_BY_PARTITION.clone()))
        .unwrap();
    registry.register(Box::new(JOBS_RUNNING.clone())).unwrap();
    registry
        .register(Box::new(ORCHESTRATOR_ACCEPTING.clone()))
        .unwrap();

    // Core metrics (submissions, stages, fallbacks, publication)
    for metric in ripline_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called right before encoding so gauges reflect the registry at scrape time.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status();
    JOBS_BY_PARTITION
        .with_label_values(&["active"])
        .set(status.active_count as i64);
    JOBS_BY_PARTITION
        .with_label_values(&["completed"])
        .set(status.completed_count as i64);
    JOBS_RUNNING.set(status.running_count as i64);
    ORCHESTRATOR_ACCEPTING.set(if status.accepting { 1 } else { 0 });
}

static UUID_REGEX: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static FILE_ROUTE_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"^(/api/v1/download|/stream)/.+$").unwrap());

/// Normalize a path for metric labels (replace IDs and filenames with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = FILE_ROUTE_REGEX.replace(&result, "$1/{filename}");
    result.to_string()
}
