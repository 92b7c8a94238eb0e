use std::time::{Duration, Instant};

use futures_util::Stream;
use tracing::info;

use crate::stream::{Fragment, FragmentKind};

/// Per-turn counters gathered while fragments flow to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnStats {
    pub fragments: usize,
    pub chars: usize,
    pub tool_calls: usize,
    pub tool_errors: usize,
    pub warnings: usize,
    pub session_id: Option<String>,
    pub answered: bool,
    pub transport_failed: bool,
}

impl TurnStats {
    pub fn record(&mut self, fragment: &Fragment) {
        self.fragments += 1;
        self.chars += fragment.text.chars().count();
        match fragment.kind {
            FragmentKind::SessionId => {
                self.session_id = fragment
                    .text
                    .strip_prefix("session_id=")
                    .map(|rest| rest.trim_end().to_string());
            }
            FragmentKind::ToolUse => self.tool_calls += 1,
            FragmentKind::ToolError => self.tool_errors += 1,
            FragmentKind::Warning | FragmentKind::Stray | FragmentKind::Unknown => {
                self.warnings += 1;
            }
            FragmentKind::Answer => self.answered = true,
            FragmentKind::TransportError => self.transport_failed = true,
            FragmentKind::ThinkingOpen
            | FragmentKind::ThinkingClose
            | FragmentKind::Thinking
            | FragmentKind::ToolSuccess => {}
        }
    }

    pub fn log(&self, elapsed: Duration) {
        info!(
            session_id = self.session_id.as_deref().unwrap_or("-"),
            fragments = self.fragments,
            chars = self.chars,
            tool_calls = self.tool_calls,
            tool_errors = self.tool_errors,
            warnings = self.warnings,
            answered = self.answered,
            transport_failed = self.transport_failed,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "turn complete"
        );
    }
}

/// Pass fragments through unchanged, logging a [`TurnStats`] summary once the
/// stream is exhausted.
///
/// A stream dropped before its end (client went away) logs nothing.
pub fn observe_turn<S>(fragments: S, started: Instant) -> impl Stream<Item = Fragment> + Send
where
    S: Stream<Item = Fragment> + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (Box::pin(fragments), TurnStats::default()),
        move |(mut fragments, mut stats)| async move {
            match fragments.as_mut().next().await {
                Some(fragment) => {
                    stats.record(&fragment);
                    Some((fragment, (fragments, stats)))
                }
                None => {
                    stats.log(started.elapsed());
                    None
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn test_record_counts_by_kind() {
        let mut stats = TurnStats::default();
        for fragment in [
            Fragment::session_id("abc-1"),
            Fragment::thinking_open(),
            Fragment::tool_use("Bash", "{}"),
            Fragment::tool_result("no such file", true),
            Fragment::stray("keepalive"),
            Fragment::thinking_close(),
            Fragment::answer("done"),
        ] {
            stats.record(&fragment);
        }
        assert_eq!(stats.fragments, 7);
        assert_eq!(stats.session_id.as_deref(), Some("abc-1"));
        assert_eq!(stats.tool_calls, 1);
        assert_eq!(stats.tool_errors, 1);
        assert_eq!(stats.warnings, 1);
        assert!(stats.answered);
        assert!(!stats.transport_failed);
    }

    #[tokio::test]
    async fn test_observe_turn_is_transparent() {
        let input = vec![Fragment::thinking("a"), Fragment::answer("b")];
        let output: Vec<Fragment> =
            observe_turn(futures_util::stream::iter(input.clone()), Instant::now())
                .collect()
                .await;
        assert_eq!(output, input);
    }
}
