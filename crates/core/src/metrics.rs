//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job submission and outcomes
//! - Stage durations (acquisition, conversion, publication)
//! - Degraded results (conversion fallbacks, publication failures)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs accepted by the orchestrator.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ripline_jobs_submitted_total", "Total jobs accepted").unwrap()
});

/// Submissions rejected before a job was created.
pub static JOBS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ripline_jobs_rejected_total",
            "Total submissions rejected at validation",
        ),
        &["reason"], // "validation", "shutting_down"
    )
    .unwrap()
});

/// Jobs that reached a terminal state.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ripline_jobs_finished_total", "Total jobs finished"),
        &["outcome"], // "completed", "error", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Stages
// =============================================================================

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("ripline_stage_duration_seconds", "Duration of job stages").buckets(
            vec![
                1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
            ],
        ),
        &["stage", "result"], // stage: "acquisition", "conversion", "publication"
    )
    .unwrap()
});

/// Conversions that failed and fell back to the acquired file.
pub static CONVERSION_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ripline_conversion_fallbacks_total",
        "Total conversions that fell back to the acquired container",
    )
    .unwrap()
});

/// Publication attempts by result.
pub static PUBLISH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ripline_publish_attempts_total",
            "Total publication attempts",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_REJECTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        // Stages
        Box::new(STAGE_DURATION.clone()),
        Box::new(CONVERSION_FALLBACKS.clone()),
        Box::new(PUBLISH_ATTEMPTS.clone()),
    ]
}
