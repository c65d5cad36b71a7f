//! HTTP multipart upload publisher.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::config::PublisherConfig;
use super::error::PublishError;
use super::traits::Publisher;
use crate::job::PublicationReference;

/// Streams artifacts to an upload endpoint with a bearer token.
pub struct HttpPublisher {
    client: Client,
    config: PublisherConfig,
}

impl HttpPublisher {
    /// Creates a publisher. Fails if the endpoint or token is blank.
    pub fn new(config: PublisherConfig) -> Result<Self, PublishError> {
        if config.upload_url.trim().is_empty() || config.token.trim().is_empty() {
            return Err(PublishError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        "http"
    }

    async fn publish(&self, path: &Path) -> Result<PublicationReference, PublishError> {
        let unreadable = |e: std::io::Error| PublishError::FileUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let size = file.metadata().await.map_err(unreadable)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact".to_string());

        debug!(file = %file_name, size, url = %self.config.upload_url, "Uploading artifact");

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), size)
            .file_name(file_name.clone());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.config.upload_url)
            .bearer_auth(&self.config.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PublishError::TimedOut {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    PublishError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        let link = extract_link(&json, &self.config.link_field)?;

        info!(file = %file_name, link = %link, "Artifact published");
        Ok(PublicationReference::new(link))
    }
}

/// Reads a string at a dotted field path, e.g. `data.url`.
pub fn extract_link(json: &serde_json::Value, field: &str) -> Result<String, PublishError> {
    field
        .split('.')
        .try_fold(json, |value, key| value.get(key))
        .and_then(|value| value.as_str())
        .filter(|link| !link.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PublishError::InvalidResponse(format!("missing '{}' in response", field)))
}
