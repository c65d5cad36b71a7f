//! Trait definitions for the publisher module.

use async_trait::async_trait;
use std::path::Path;

use super::error::PublishError;
use crate::job::PublicationReference;

/// Uploads a finished artifact to a remote store.
///
/// A publisher is a pre-authorized capability: it either works with the
/// credentials it was built with or returns an error.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Uploads the file at `path` and returns a shareable reference.
    async fn publish(&self, path: &Path) -> Result<PublicationReference, PublishError>;
}
