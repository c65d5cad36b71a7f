use std::path::Path;
use std::sync::Arc;
use ripline_core::{Config, JobOrchestrator, ProcessRunner, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<JobOrchestrator>,
    runner: Arc<dyn ProcessRunner>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<JobOrchestrator>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            runner,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.orchestrator
    }

    /// Runner used for tool availability probes.
    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    /// Directory media is written to and served from.
    pub fn output_dir(&self) -> &Path {
        self.orchestrator.output_dir()
    }
}
