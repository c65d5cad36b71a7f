//! Configuration for the acquisition stage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the N_m3u8DL-RE downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquirerConfig {
    /// Path to the N_m3u8DL-RE binary.
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,

    /// Download video, audio and subtitle tracks concurrently (`-mt`).
    #[serde(default = "default_concurrent_download")]
    pub concurrent_download: bool,

    /// Timeout for one acquisition in seconds (0 disables it).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("N_m3u8DL-RE")
}

fn default_concurrent_download() -> bool {
    true
}

fn default_timeout() -> u64 {
    4 * 3600
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            concurrent_download: default_concurrent_download(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AcquirerConfig {
    /// Creates a config with a custom binary path.
    pub fn with_path(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enables or disables concurrent track download.
    pub fn with_concurrent_download(mut self, enabled: bool) -> Self {
        self.concurrent_download = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
