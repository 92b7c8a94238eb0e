/// Error type shared by the front-end, the request builder and the transport.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Authentication,
    ServerError,
}

impl PipeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipeError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            PipeError::Auth(_) => ErrorCategory::Authentication,
            PipeError::Transport(_) | PipeError::Internal(_) => ErrorCategory::ServerError,
        }
    }
}

// ---------------------------------------------------------------------------
// Category -> HTTP status code
// ---------------------------------------------------------------------------

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::Authentication => http::StatusCode::UNAUTHORIZED,
        ErrorCategory::ServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_type_for_category(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidRequest => "invalid_request_error",
        ErrorCategory::Authentication => "authentication_error",
        ErrorCategory::ServerError => "server_error",
    }
}

/// Format an error as an OpenAI-style payload, returning (`status_code`, JSON body).
#[must_use]
pub fn format_error(err: &PipeError) -> (http::StatusCode, serde_json::Value) {
    let cat = err.category();
    let status = http_status_for_category(cat);
    let body = serde_json::json!({
        "error": {
            "message": err.to_string(),
            "type": error_type_for_category(cat),
            "code": status.as_u16(),
        }
    });
    (status, body)
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

impl axum::response::IntoResponse for PipeError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
