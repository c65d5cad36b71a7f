//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external tool and
//! publication seams, so the whole pipeline can be exercised without
//! N_m3u8DL-RE, ffmpeg or a remote store.
//!
//! # Example
//!
//! ```rust,ignore
//! use ripline_core::testing::{MockPublisher, ScriptedRunner, ToolBehavior};
//!
//! let runner = ScriptedRunner::new();
//! runner.set_behavior("N_m3u8DL-RE", ToolBehavior::success().creating("clip.mkv")).await;
//! runner.set_behavior("ffmpeg", ToolBehavior::success().creating("clip.mp4")).await;
//!
//! let publisher = MockPublisher::new();
//! // Hand both to JobOrchestrator::new...
//! ```

mod mock_publisher;
mod mock_runner;

pub use mock_publisher::MockPublisher;
pub use mock_runner::{ScriptedExit, ScriptedRunner, ToolBehavior};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::job::JobRequest;

    /// Program name the default acquirer config invokes.
    pub const ACQUIRER_PROGRAM: &str = "N_m3u8DL-RE";

    /// Program name the default converter config invokes.
    pub const FFMPEG_PROGRAM: &str = "ffmpeg";

    /// Create a job request with one key and default selectors.
    pub fn job_request(save_name: &str) -> JobRequest {
        JobRequest::new(
            "https://cdn.example.com/manifest.mpd",
            save_name,
            vec!["0123456789abcdef:fedcba9876543210".to_string()],
        )
    }
}
