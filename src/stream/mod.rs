//! Incremental rendering of the remote server's event stream.
//!
//! The response body is split into lines ([`lines`]), each line is decoded
//! and dispatched by a [`StreamRenderer`] ([`render`]), and the resulting
//! [`Fragment`]s are yielded one at a time. Nothing is read from the body
//! until the fragments of the previous line have been consumed.

pub mod event;
pub mod fragment;
pub mod lines;
pub mod render;

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures_util::Stream;

pub use event::InboundEvent;
pub use fragment::{Fragment, FragmentKind};
pub use lines::{line_stream, LineSplitter};
pub use render::{Mode, StreamRenderer};

/// Render a stream of body lines into display fragments.
///
/// A line-level transport error is reported as one warning fragment and ends
/// the stream.
pub fn render_lines<S, E>(lines: S) -> impl Stream<Item = Fragment> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(lines),
            StreamRenderer::new(),
            VecDeque::<Fragment>::with_capacity(4),
            Vec::<Fragment>::with_capacity(4),
            false,
        ),
        |(mut lines, mut renderer, mut pending, mut rendered, mut done)| async move {
            loop {
                if let Some(fragment) = pending.pop_front() {
                    return Some((fragment, (lines, renderer, pending, rendered, done)));
                }
                if done {
                    return None;
                }

                match lines.as_mut().next().await {
                    Some(Ok(line)) => renderer.push_line(&line, &mut rendered),
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "response body interrupted");
                        rendered.push(Fragment::warning(&format!("Stream interrupted: {err}")));
                        renderer.finish(&mut rendered);
                        done = true;
                    }
                    None => {
                        renderer.finish(&mut rendered);
                        done = true;
                    }
                }
                pending.extend(rendered.drain(..));
            }
        },
    )
}

/// Render a raw chunked body into display fragments.
pub fn render_body<S, E>(byte_stream: S) -> impl Stream<Item = Fragment> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    render_lines(line_stream(byte_stream))
}

/// Describe a non-success response from the remote server.
///
/// When the body is a JSON object with an `error` field its value is
/// appended to the message.
#[must_use]
pub fn transport_failure(status: u16, body: &[u8]) -> Fragment {
    let mut message = format!("Request to code assistant server failed with status code: {status}");
    if let Some(detail) = error_detail(body) {
        message.push_str(" - ");
        message.push_str(&detail);
    }
    Fragment::transport_error(&message)
}

fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let detail = value.as_object()?.get("error")?;
    Some(event::value_text(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        futures_util::stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_render_body_across_chunk_boundaries() {
        let body = chunks(&[
            "data: {\"type\":\"system\",\"subtype\":\"init\",\"sess",
            "ion_id\":\"abc-123\"}\n\ndata: {\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"hm\"}]}}\n",
            "\ndata: {\"type\":\"assistant\",\"message\":{\"stop_reason\":\"end_turn\",\"content\":[{\"type\":\"text\",\"text\":\"ok\"}]}}",
        ]);
        let fragments: Vec<Fragment> = render_body(body).collect().await;
        let kinds: Vec<FragmentKind> = fragments.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::SessionId,
                FragmentKind::ThinkingOpen,
                FragmentKind::Thinking,
                FragmentKind::ThinkingClose,
                FragmentKind::Answer,
            ]
        );
        assert_eq!(fragments[0].text, "session_id=abc-123\n\n");
    }

    #[tokio::test]
    async fn test_render_body_is_lazy() {
        let body = chunks(&["data: {\"type\":\"ping\"}\n", "data: {\"type\":\"pong\"}\n"]);
        let mut stream = Box::pin(render_body(body));
        let first = stream.next().await.expect("first fragment");
        assert!(first.text.contains("ping"));
        let second = stream.next().await.expect("second fragment");
        assert!(second.text.contains("pong"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_body_error_becomes_warning() {
        let body = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"keepalive\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer")),
        ]);
        let fragments: Vec<Fragment> = render_body(body).collect().await;
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].kind, FragmentKind::Stray);
        assert_eq!(fragments[1].kind, FragmentKind::Warning);
        assert!(fragments[1].text.contains("reset by peer"));
    }

    #[test]
    fn test_transport_failure_with_error_field() {
        let fragment = transport_failure(400, br#"{"error": "bad request"}"#);
        assert_eq!(fragment.kind, FragmentKind::TransportError);
        assert!(fragment.text.contains("400"));
        assert!(fragment.text.contains("bad request"));
    }

    #[test]
    fn test_transport_failure_without_json_body() {
        let fragment = transport_failure(502, b"<html>Bad Gateway</html>");
        assert_eq!(
            fragment.text,
            "Request to code assistant server failed with status code: 502"
        );
        let fragment = transport_failure(500, br#"["error"]"#);
        assert!(!fragment.text.contains(" - "));
    }

    #[test]
    fn test_transport_failure_structured_error() {
        let fragment = transport_failure(422, br#"{"error": {"field": "prompt"}}"#);
        assert!(fragment.text.ends_with(" - {\"field\":\"prompt\"}"));
    }
}
