use serde_json::Value;

use super::event::{
    tool_result_text, value_text, AssistantContent, AssistantEvent, InboundEvent, UserContent,
};
use super::fragment::{truncate_chars, Fragment, MAX_FIELD_CHARS};

/// Framing prefix of an event line.
pub const DATA_PREFIX: &str = "data: ";

/// Where the renderer stands relative to the thinking region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No `init` seen yet.
    #[default]
    Idle,
    /// Region opened by `init`; intermediate output goes here.
    Thinking,
    /// Region closed by `end_turn` or an upstream error. Terminal for the turn.
    Final,
}

/// Stateful translator from stream lines to display fragments.
///
/// One instance per turn. Lines are fed in arrival order through
/// [`StreamRenderer::push_line`]; [`StreamRenderer::finish`] is called once
/// the body ends.
#[derive(Debug, Default)]
pub struct StreamRenderer {
    buffer: String,
    mode: Mode,
}

impl StreamRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Bytes of `data:` payload held while waiting for the rest of a value.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all state, as if no line had been fed.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.mode = Mode::Idle;
    }

    /// Feed one body line (without its line terminator).
    pub fn push_line(&mut self, line: &[u8], out: &mut Vec<Fragment>) {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "stream line is not valid UTF-8");
                out.push(Fragment::warning(&format!(
                    "Failed to decode stream line: {err}"
                )));
                return;
            }
        };

        if let Some(payload) = text.strip_prefix(DATA_PREFIX) {
            self.push_payload(payload, out);
            return;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(Fragment::stray(trimmed));
        }
    }

    /// Flush end-of-stream state.
    ///
    /// A payload still buffered at this point never completed; it is reported
    /// once rather than dropped.
    pub fn finish(&mut self, out: &mut Vec<Fragment>) {
        if self.buffer.trim().is_empty() {
            self.buffer.clear();
            return;
        }
        tracing::warn!(
            buffered = self.buffer.len(),
            "stream ended with an incomplete event payload"
        );
        let pending = std::mem::take(&mut self.buffer);
        let mut message = String::from("Incomplete event at end of stream: ");
        message.push_str(&truncate_chars(&pending, MAX_FIELD_CHARS));
        out.push(Fragment::warning(&message));
    }

    fn push_payload(&mut self, payload: &str, out: &mut Vec<Fragment>) {
        self.buffer.push_str(payload);
        match serde_json::from_str::<Value>(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                match InboundEvent::from_value(value) {
                    Ok(event) => self.dispatch(event, out),
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to decode stream event");
                        out.push(Fragment::warning(&format!(
                            "Failed to decode stream event: {err}"
                        )));
                    }
                }
            }
            Err(err) => {
                // Presumed split across a transport chunk; wait for more.
                tracing::debug!(
                    buffered = self.buffer.len(),
                    error = %err,
                    "retaining partial event payload"
                );
            }
        }
    }

    /// Render one decoded event.
    pub fn dispatch(&mut self, event: InboundEvent, out: &mut Vec<Fragment>) {
        tracing::trace!(event_type = event.type_name(), mode = ?self.mode, "dispatch");
        match event {
            InboundEvent::System(system) => {
                if let Some(session_id) = system.init_session_id() {
                    out.push(Fragment::session_id(session_id));
                    if self.mode == Mode::Idle {
                        out.push(Fragment::thinking_open());
                        self.mode = Mode::Thinking;
                    }
                }
            }
            InboundEvent::Assistant(assistant) => self.dispatch_assistant(assistant, out),
            InboundEvent::User(user) => {
                for item in user.message.content {
                    if let UserContent::ToolResult { content, is_error } = item {
                        out.push(Fragment::tool_result(&tool_result_text(&content), is_error));
                    }
                }
            }
            // Repeats the final assistant text.
            InboundEvent::Result(_) => {}
            InboundEvent::Error(error) => {
                self.close_thinking(out);
                out.push(Fragment::warning(&error.message()));
            }
            InboundEvent::Unknown(value) => {
                out.push(Fragment::unknown(&value_text(&value)));
            }
        }
    }

    fn dispatch_assistant(&mut self, assistant: AssistantEvent, out: &mut Vec<Fragment>) {
        if assistant.message.is_end_turn() {
            self.close_thinking(out);
            for item in assistant.message.content {
                if let AssistantContent::Text { text } = item {
                    out.push(Fragment::answer(&text));
                }
            }
            return;
        }

        for item in assistant.message.content {
            match item {
                AssistantContent::Text { text } => out.push(Fragment::thinking(&text)),
                AssistantContent::ToolUse { name, input } => {
                    out.push(Fragment::tool_use(&name, &input.to_string()));
                }
                AssistantContent::Other => {}
            }
        }
    }

    fn close_thinking(&mut self, out: &mut Vec<Fragment>) {
        if self.mode != Mode::Final {
            out.push(Fragment::thinking_close());
            self.mode = Mode::Final;
        }
    }
}
