use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one completed job is retained
/// - Publisher, when present, has an http(s) endpoint and a token
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.completed_retention == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.completed_retention must be at least 1".to_string(),
        ));
    }

    if let Some(publisher) = &config.publisher {
        let url = publisher.upload_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "publisher.upload_url must be an http(s) URL, got '{}'",
                publisher.upload_url
            )));
        }
        if publisher.token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "publisher.token cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::publisher::PublisherConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_retention_fails() {
        let mut config = Config::default();
        config.orchestrator.completed_retention = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_publisher_url_scheme() {
        let config = Config {
            publisher: Some(PublisherConfig::new("ftp://uploads.example.com", "token")),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let config = Config {
            publisher: Some(PublisherConfig::new("https://uploads.example.com", "token")),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_publisher_empty_token() {
        let config = Config {
            publisher: Some(PublisherConfig::new("https://uploads.example.com", "  ")),
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("publisher.token"));
    }
}
