use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::acquirer::AcquirerConfig;
use crate::converter::ConverterConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::publisher::PublisherConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub acquirer: AcquirerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Publication is skipped when this section is absent.
    #[serde(default)]
    pub publisher: Option<PublisherConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Where acquired and converted media is written and served from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("stream")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub acquirer: AcquirerConfig,
    pub converter: ConverterConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<SanitizedPublisherConfig>,
}

/// Sanitized publisher config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPublisherConfig {
    pub upload_url: String,
    pub token_configured: bool,
    pub link_field: String,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            acquirer: config.acquirer.clone(),
            converter: config.converter.clone(),
            orchestrator: config.orchestrator.clone(),
            publisher: config
                .publisher
                .as_ref()
                .map(|p| SanitizedPublisherConfig {
                    upload_url: p.upload_url.clone(),
                    token_configured: !p.token.is_empty(),
                    link_field: p.link_field.clone(),
                    timeout_secs: p.timeout_secs,
                }),
        }
    }
}
