pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Path of the code-assistant API on the remote server. Not configurable.
pub const SERVER_API_PATH: &str = "/api/claude";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Listener configuration for the chat-facing HTTP front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub base_path: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            base_path: String::new(),
        }
    }
}

/// Remote code-assistant server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Longest silence, in seconds, tolerated between body chunks. A turn
    /// may stream for any total duration. `0` disables it.
    #[serde(default = "default_read_timeout", alias = "timeout")]
    pub read_timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_read_timeout() -> u64 {
    600
}
fn default_http_pool_max_idle_per_host() -> usize {
    4
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            read_timeout: default_read_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_use_env_proxy: false,
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the streaming endpoint on the remote server.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut out = String::with_capacity(base.len() + SERVER_API_PATH.len());
        out.push_str(base);
        out.push_str(SERVER_API_PATH);
        out
    }
}

/// Client authentication configuration. An empty key list disables auth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientAuthConfig {
    #[serde(default)]
    pub allowed_keys: Vec<String>,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Model id advertised to the chat front-end.
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_model_id() -> String {
    "claude-code".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            model_id: default_model_id(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub client_authentication: ClientAuthConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.upstream.base_url, "http://localhost:3000");
        assert_eq!(config.features.model_id, "claude-code");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.upstream.base_url, "http://localhost:3000");
        assert_eq!(config.upstream.read_timeout, 600);
        assert!(config.client_authentication.allowed_keys.is_empty());
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_legacy_timeout_key_sets_read_timeout() {
        let config = parse_config("upstream:\n  timeout: 30\n").unwrap();
        assert_eq!(config.upstream.read_timeout, 30);
    }

    #[test]
    fn test_endpoint_appends_fixed_api_path() {
        let upstream = UpstreamConfig {
            base_url: "https://cc.internal:3000/".to_string(),
            ..UpstreamConfig::default()
        };
        assert_eq!(upstream.endpoint(), "https://cc.internal:3000/api/claude");
        assert_eq!(
            UpstreamConfig::default().endpoint(),
            "http://localhost:3000/api/claude"
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let err = parse_config("upstream: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
