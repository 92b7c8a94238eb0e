//! `POST /v1/chat/completions`: one chat turn relayed to the code assistant
//! server, its event stream rendered as assistant text.

mod encode;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::directive::{build_server_request, ChatMessage};
use crate::error::PipeError;
use crate::observability::observe_turn;
use crate::state::AppState;
use crate::util::unix_now_secs;

use encode::{
    encode_completion, encode_content_chunk, encode_finish_chunk, encode_role_chunk,
    CompletionMeta, DONE_FRAME,
};

/// The subset of an `OpenAI` chat request this service reads.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "chat completion rejected");
            err.into_response()
        }
    }
}

async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, PipeError> {
    state.authenticate(headers)?;

    let request: ChatCompletionRequest = serde_json::from_slice(body)
        .map_err(|err| PipeError::InvalidRequest(format!("Invalid JSON body: {err}")))?;
    let server_request = build_server_request(&request.messages)?;

    let meta = CompletionMeta {
        id: state.next_completion_id(),
        model: request
            .model
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| state.model_id().to_string()),
        created: unix_now_secs(),
    };
    tracing::info!(
        id = %meta.id,
        stream = request.stream,
        history = request.messages.len(),
        "chat turn started"
    );

    let fragments = observe_turn(state.client.render_turn(server_request), Instant::now());

    if request.stream {
        return Ok(streaming_response(meta, fragments));
    }

    let content: String = fragments
        .fold(String::new(), |mut content, fragment| async move {
            content.push_str(&fragment.text);
            content
        })
        .await;
    Ok(Json(encode_completion(&meta, &content)).into_response())
}

fn streaming_response<S>(meta: CompletionMeta, fragments: S) -> Response
where
    S: futures_util::Stream<Item = crate::stream::Fragment> + Send + 'static,
{
    let head = encode_role_chunk(&meta);
    let tail = [encode_finish_chunk(&meta), DONE_FRAME.to_string()];
    let frames = futures_util::stream::once(async move { head })
        .chain(fragments.map(move |fragment| encode_content_chunk(&meta, &fragment.text)))
        .chain(futures_util::stream::iter(tail))
        .map(|frame| Ok::<_, Infallible>(Bytes::from(frame)));

    sse_ok_response(Body::from_stream(frames))
}

#[inline]
fn sse_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::from_config(AppConfig::default()).unwrap())
    }

    async fn error_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let response = handler(State(state()), HeaderMap::new(), Bytes::from_static(b"{")).await;
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_empty_messages_is_bad_request() {
        let response = handler(
            State(state()),
            HeaderMap::new(),
            Bytes::from_static(br#"{"messages":[]}"#),
        )
        .await;
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("No messages provided"));
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatCompletionRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert!(!request.stream);
        assert!(request.model.is_none());
        assert_eq!(request.messages[0].text(), "hi");
    }
}
