//! Job orchestrator for the acquire, convert, publish pipeline.
//!
//! The orchestrator drives each job through the state machine on its own task:
//! - **Acquisition**: N_m3u8DL-RE download and decryption (fatal on failure)
//! - **Conversion**: ffmpeg remux to MP4 (falls back to the acquired file)
//! - **Publication**: optional upload (failure is recorded, never fatal)
//!
//! A semaphore bounds how many jobs run at once.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{OrchestratorStatus, SubmitError};
