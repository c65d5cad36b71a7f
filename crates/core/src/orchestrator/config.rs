//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum jobs running at once (0 = unlimited).
    /// Jobs over the limit wait in `queued` until a slot is free.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Completed jobs kept in memory for status queries.
    #[serde(default = "default_retention")]
    pub completed_retention: usize,

    /// Upper bound for one publication in seconds (0 = unlimited).
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_retention() -> usize {
    100
}

fn default_publish_timeout() -> u64 {
    600 // 10 minutes
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent(),
            completed_retention: default_retention(),
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

impl OrchestratorConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}
