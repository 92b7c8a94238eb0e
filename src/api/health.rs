use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "codepipe is running",
        "config": {
            "upstream_endpoint": state.client.endpoint(),
            "client_keys_count": config.client_authentication.allowed_keys.len(),
            "features": {
                "log_level": config.features.log_level,
                "model_id": config.features.model_id,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_health_reports_endpoint_and_model() {
        let state = Arc::new(AppState::from_config(AppConfig::default()).unwrap());
        let Json(body) = health_handler(State(state));
        assert_eq!(body["status"], "codepipe is running");
        assert_eq!(
            body["config"]["upstream_endpoint"],
            "http://localhost:3000/api/claude"
        );
        assert_eq!(body["config"]["features"]["model_id"], "claude-code");
        assert_eq!(body["config"]["client_keys_count"], 0);
    }
}
