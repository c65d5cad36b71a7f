//! Job records and the registry that tracks them.

mod error;
mod registry;
mod types;

pub use error::{RegistryError, ValidationError};
pub use registry::{JobRegistry, Partition, DEFAULT_COMPLETED_RETENTION};
pub use types::{
    output_tail, ArtifactDescriptor, Diagnostics, JobErrorKind, JobRecord, JobRequest, JobStatus,
    PublicationReference, DIAGNOSTIC_TAIL_BYTES,
};
