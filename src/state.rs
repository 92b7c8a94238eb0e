use std::sync::atomic::AtomicU64;

use crate::auth::{authenticate, AllowedClientKeys};
use crate::config::AppConfig;
use crate::error::PipeError;
use crate::transport::ServerClient;
use crate::util::next_generated_id;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub client: ServerClient,
    allowed_client_keys: AllowedClientKeys,
    completion_ids: AtomicU64,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        client: ServerClient,
        allowed_client_keys: AllowedClientKeys,
    ) -> Self {
        Self {
            config,
            client,
            allowed_client_keys,
            completion_ids: AtomicU64::new(1),
        }
    }

    /// Build state from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, PipeError> {
        let client = ServerClient::new(&config.upstream)?;
        let allowed_client_keys = crate::auth::build_allowed_key_set(&config);
        Ok(Self::new(config, client, allowed_client_keys))
    }

    /// Authenticate a request using the prebuilt key index.
    ///
    /// # Errors
    ///
    /// Returns `PipeError::Auth` when the API key is missing or invalid.
    pub fn authenticate(&self, headers: &http::HeaderMap) -> Result<(), PipeError> {
        authenticate(headers, &self.allowed_client_keys)
    }

    #[must_use]
    pub fn next_completion_id(&self) -> String {
        next_generated_id("chatcmpl-", &self.completion_ids)
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.config.features.model_id
    }
}
