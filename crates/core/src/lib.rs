pub mod acquirer;
pub mod config;
pub mod converter;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod process;
pub mod publisher;
pub mod testing;

pub use acquirer::{AcquirerConfig, AcquisitionCommand};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use converter::{ContainerFormat, ConverterConfig, RemuxCommand};
pub use job::{
    ArtifactDescriptor, Diagnostics, JobErrorKind, JobRecord, JobRegistry, JobRequest, JobStatus,
    PublicationReference, RegistryError, ValidationError,
};
pub use orchestrator::{JobOrchestrator, OrchestratorConfig, OrchestratorStatus, SubmitError};
pub use process::{
    probe_tool, ProcessError, ProcessInvocation, ProcessOutput, ProcessRunner, TokioProcessRunner,
    ToolProbe, ToolStatus,
};
pub use publisher::{HttpPublisher, PublishError, Publisher, PublisherConfig};
