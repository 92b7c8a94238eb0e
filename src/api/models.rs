use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::state::AppState;

const MODEL_CREATED: u64 = 1_677_610_602;

/// List the single configured model in `OpenAI` format.
pub fn handler(State(state): State<Arc<AppState>>, headers: &HeaderMap) -> Response {
    if let Err(err) = state.authenticate(headers) {
        return err.into_response();
    }

    let model_id = state.model_id();
    Json(json!({
        "object": "list",
        "data": [{
            "id": model_id,
            "object": "model",
            "created": MODEL_CREATED,
            "owned_by": "codepipe",
            "permission": [],
            "root": model_id,
            "parent": null,
        }]
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ClientAuthConfig, FeaturesConfig};

    fn state_with_key() -> Arc<AppState> {
        let config = AppConfig {
            client_authentication: ClientAuthConfig {
                allowed_keys: vec!["test-key".into()],
            },
            features: FeaturesConfig {
                model_id: "cc-local".into(),
                ..FeaturesConfig::default()
            },
            ..AppConfig::default()
        };
        Arc::new(AppState::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn test_handler_lists_configured_model() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test-key".parse().unwrap());
        let response = handler(State(state_with_key()), &headers);
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], "cc-local");
        assert_eq!(data[0]["root"], "cc-local");
        assert_eq!(data[0]["object"], "model");
    }

    #[test]
    fn test_handler_requires_key() {
        let response = handler(State(state_with_key()), &HeaderMap::new());
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }
}
