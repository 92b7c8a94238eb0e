use super::{AppConfig, ConfigError};

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_upstream(config)?;
    validate_allowed_keys(config)?;
    validate_log_level(config)?;
    validate_model_id(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_upstream(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    let parsed = url::Url::parse(&upstream.base_url).map_err(|err| {
        validation_err(format!(
            "upstream.base_url '{}' is not a valid URL: {err}",
            upstream.base_url
        ))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(
            "upstream.base_url must start with http:// or https://",
        ));
    }
    if parsed.host_str().is_none() {
        return Err(validation_err("upstream.base_url must include a host"));
    }
    if upstream.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "upstream.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_allowed_keys(config: &AppConfig) -> Result<(), ConfigError> {
    for key in &config.client_authentication.allowed_keys {
        if key.trim().is_empty() {
            return Err(validation_err("allowed_keys contains an empty key"));
        }
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "log_level '{}' is invalid. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_model_id(config: &AppConfig) -> Result<(), ConfigError> {
    if config.features.model_id.trim().is_empty() {
        return Err(validation_err("features.model_id cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientAuthConfig, UpstreamConfig};

    fn assert_validation_err(config: &AppConfig, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {msg}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = AppConfig {
            upstream: UpstreamConfig {
                base_url: "ftp://localhost:3000".to_string(),
                ..UpstreamConfig::default()
            },
            ..AppConfig::default()
        };
        assert_validation_err(&config, "http:// or https://");
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let config = AppConfig {
            upstream: UpstreamConfig {
                base_url: "localhost:3000".to_string(),
                ..UpstreamConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_blank_client_key() {
        let config = AppConfig {
            client_authentication: ClientAuthConfig {
                allowed_keys: vec!["ok".to_string(), "  ".to_string()],
            },
            ..AppConfig::default()
        };
        assert_validation_err(&config, "empty key");
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = AppConfig::default();
        config.features.log_level = "warning".to_string();
        assert!(validate_config(&config).is_ok());
        config.features.log_level = "verbose".to_string();
        assert_validation_err(&config, "log_level");
    }
}
