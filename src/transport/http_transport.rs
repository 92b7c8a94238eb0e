use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::config::UpstreamConfig;
use crate::directive::ServerRequest;
use crate::error::PipeError;
use crate::stream::{render_body, transport_failure, Fragment};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(config: &UpstreamConfig) -> Result<reqwest::Client, PipeError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none());

    // Idle limit between chunks only; total turn length is unbounded.
    if config.read_timeout > 0 {
        builder = builder.read_timeout(Duration::from_secs(config.read_timeout));
    }
    if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| PipeError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Outcome of posting one turn to the remote server.
#[derive(Debug)]
pub enum TurnResponse {
    /// 200 OK; the body is the event stream.
    Streaming(reqwest::Response),
    /// Any other status, with the body read in full.
    Failed { status: u16, body: Bytes },
}

/// HTTP client for the remote code-assistant server.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ServerClient {
    client: reqwest::Client,
    endpoint: Arc<str>,
}

impl ServerClient {
    /// Build a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Transport`] when the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &UpstreamConfig) -> Result<Self, PipeError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
            endpoint: Arc::from(config.endpoint()),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post a turn and classify the response by status.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Transport`] when the request cannot be sent or no
    /// response headers arrive.
    pub async fn open_turn(&self, request: &ServerRequest) -> Result<TurnResponse, PipeError> {
        tracing::info!(
            endpoint = %self.endpoint,
            resumed = request.session_id.is_some(),
            "forwarding turn to code assistant server"
        );

        let body = serde_json::to_vec(request)
            .map_err(|err| PipeError::Internal(format!("Failed to encode request: {err}")))?;
        let response = self
            .client
            .post(self.endpoint.as_ref())
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::ACCEPT, "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(|err| PipeError::Transport(format!("Request failed: {err}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(TurnResponse::Streaming(response));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(error = %err, "failed to read error response body");
                Bytes::new()
            }
        };
        tracing::warn!(
            status = status.as_u16(),
            body_len = body.len(),
            "code assistant server rejected turn"
        );
        Ok(TurnResponse::Failed {
            status: status.as_u16(),
            body,
        })
    }

    /// Post a turn and render the reply as display fragments.
    ///
    /// Connection failures and non-200 statuses produce exactly one
    /// transport-error fragment and no event parsing.
    #[must_use]
    pub fn render_turn(&self, request: ServerRequest) -> BoxStream<'static, Fragment> {
        let client = self.clone();
        futures_util::stream::once(async move {
            match client.open_turn(&request).await {
                Ok(TurnResponse::Streaming(response)) => {
                    render_body(response.bytes_stream()).boxed()
                }
                Ok(TurnResponse::Failed { status, body }) => {
                    futures_util::stream::iter([transport_failure(status, &body)]).boxed()
                }
                Err(err) => {
                    tracing::warn!(error = %err, "code assistant server unreachable");
                    futures_util::stream::iter([Fragment::transport_error(&err.to_string())])
                        .boxed()
                }
            }
        })
        .flatten()
        .boxed()
    }
}

impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FragmentKind;

    #[test]
    fn test_endpoint_from_config() {
        let client = ServerClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:3999/".to_string(),
            ..UpstreamConfig::default()
        })
        .expect("client");
        assert_eq!(client.endpoint(), "http://127.0.0.1:3999/api/claude");
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_single_transport_fragment() {
        // Port 9 (discard) on loopback is closed in test environments.
        let client = ServerClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..UpstreamConfig::default()
        })
        .expect("client");
        let fragments: Vec<Fragment> = client
            .render_turn(ServerRequest::new("hello"))
            .collect()
            .await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, FragmentKind::TransportError);
        assert!(fragments[0].text.contains("Request failed"));
    }

    #[tokio::test]
    async fn test_slow_stream_outlives_read_timeout() {
        use axum::routing::post;

        // Each chunk arrives well within the idle limit; the whole turn does not.
        let app = axum::Router::new().route(
            "/api/claude",
            post(|| async {
                let chunks = futures_util::stream::unfold(0_u32, |step| async move {
                    if step == 4 {
                        return None;
                    }
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    let line = format!(
                        "data: {{\"type\":\"assistant\",\"message\":{{\"content\":[{{\"type\":\"text\",\"text\":\"step {step}\"}}]}}}}\n"
                    );
                    Some((Ok::<_, std::convert::Infallible>(line), step + 1))
                });
                axum::body::Body::from_stream(chunks)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = ServerClient::new(&UpstreamConfig {
            base_url: format!("http://{addr}"),
            read_timeout: 1,
            ..UpstreamConfig::default()
        })
        .expect("client");
        let fragments: Vec<Fragment> = client
            .render_turn(ServerRequest::new("hello"))
            .collect()
            .await;

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["🤔 step 0\n", "🤔 step 1\n", "🤔 step 2\n", "🤔 step 3\n"]
        );
        assert!(fragments.iter().all(|f| f.kind == FragmentKind::Thinking));

        server.abort();
    }
}
