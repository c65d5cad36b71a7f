//! Configuration for the publisher module.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP upload publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Endpoint accepting a multipart `file` upload.
    pub upload_url: String,

    /// Pre-issued bearer token.
    pub token: String,

    /// JSON field of the response holding the shareable link (dots for nesting).
    #[serde(default = "default_link_field")]
    pub link_field: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_link_field() -> String {
    "link".to_string()
}

fn default_timeout() -> u64 {
    600
}

impl PublisherConfig {
    pub fn new(upload_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            token: token.into(),
            link_field: default_link_field(),
            timeout_secs: default_timeout(),
        }
    }

    /// Sets the response field holding the link.
    pub fn with_link_field(mut self, field: impl Into<String>) -> Self {
        self.link_field = field.into();
        self
    }
}
