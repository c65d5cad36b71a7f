//! Mock publisher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::job::PublicationReference;
use crate::publisher::{PublishError, Publisher};

/// Mock implementation of the Publisher trait.
///
/// Succeeds with `https://share.example.com/<file name>` unless an error is
/// queued with `set_next_error`.
#[derive(Debug)]
pub struct MockPublisher {
    /// Paths passed to `publish`.
    published: Arc<RwLock<Vec<PathBuf>>>,
    /// If set, the next publish will fail with this error.
    next_error: Arc<RwLock<Option<PublishError>>>,
    /// Simulated upload duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all paths that were published (or attempted).
    pub async fn recorded_paths(&self) -> Vec<PathBuf> {
        self.published.read().await.clone()
    }

    /// Configure the next publish to fail with the given error.
    pub async fn set_next_error(&self, error: PublishError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated upload duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, path: &Path) -> Result<PublicationReference, PublishError> {
        self.published.write().await.push(path.to_path_buf());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(PublicationReference::new(format!(
            "https://share.example.com/{}",
            name
        )))
    }
}
