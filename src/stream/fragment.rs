//! Display fragments produced by the renderer.
//!
//! A turn's visible reply is the in-order concatenation of [`Fragment::text`].
//! [`FragmentKind`] keeps the category of each piece so callers (and tests)
//! can tell a thinking line from a tool result without sniffing glyphs.

use std::borrow::Cow;

/// Longest content, in characters, emitted before truncation kicks in.
pub const MAX_FIELD_CHARS: usize = 500;
/// Appended to any content cut at [`MAX_FIELD_CHARS`].
pub const TRUNCATION_MARKER: &str = "...(truncated)";

pub const THINKING_OPEN: &str = "<thinking>\n";
pub const THINKING_CLOSE: &str = "\n</thinking>\n\n";

const THINKING_GLYPH: &str = "🤔";
const TOOL_GLYPH: &str = "🔧";
const SUCCESS_GLYPH: &str = "✅";
const ERROR_GLYPH: &str = "❌";
const WARNING_GLYPH: &str = "⚠️";
const FALLBACK_GLYPH: &str = "❓";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// `session_id=<id>` announcement, round-tripped by the caller's history.
    SessionId,
    ThinkingOpen,
    ThinkingClose,
    /// Intermediate assistant text.
    Thinking,
    ToolUse,
    ToolSuccess,
    ToolError,
    /// Final assistant text, outside the thinking region.
    Answer,
    Warning,
    /// Event type this renderer does not know.
    Unknown,
    /// Non-`data:` line passed through from the body.
    Stray,
    /// Non-success status or connection failure talking to the server.
    TransportError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    #[must_use]
    pub fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn session_id(id: &str) -> Self {
        let mut text = String::with_capacity(13 + id.len());
        text.push_str("session_id=");
        text.push_str(id);
        text.push_str("\n\n");
        Self::new(FragmentKind::SessionId, text)
    }

    #[must_use]
    pub fn thinking_open() -> Self {
        Self::new(FragmentKind::ThinkingOpen, THINKING_OPEN)
    }

    #[must_use]
    pub fn thinking_close() -> Self {
        Self::new(FragmentKind::ThinkingClose, THINKING_CLOSE)
    }

    #[must_use]
    pub fn thinking(text: &str) -> Self {
        Self::glyph_line(FragmentKind::Thinking, THINKING_GLYPH, text)
    }

    #[must_use]
    pub fn tool_use(name: &str, input: &str) -> Self {
        let input = truncate_chars(input, MAX_FIELD_CHARS);
        let mut text = String::with_capacity(TOOL_GLYPH.len() + name.len() + input.len() + 4);
        text.push_str(TOOL_GLYPH);
        text.push(' ');
        text.push_str(name);
        text.push_str(": ");
        text.push_str(&input);
        text.push('\n');
        Self::new(FragmentKind::ToolUse, text)
    }

    #[must_use]
    pub fn tool_result(content: &str, is_error: bool) -> Self {
        if is_error {
            Self::glyph_line(FragmentKind::ToolError, ERROR_GLYPH, content)
        } else {
            Self::glyph_line(FragmentKind::ToolSuccess, SUCCESS_GLYPH, content)
        }
    }

    #[must_use]
    pub fn answer(text: &str) -> Self {
        Self::new(
            FragmentKind::Answer,
            truncate_chars(text, MAX_FIELD_CHARS).into_owned(),
        )
    }

    #[must_use]
    pub fn warning(message: &str) -> Self {
        Self::glyph_line(FragmentKind::Warning, WARNING_GLYPH, message)
    }

    #[must_use]
    pub fn unknown(raw: &str) -> Self {
        Self::glyph_line(FragmentKind::Unknown, FALLBACK_GLYPH, raw)
    }

    #[must_use]
    pub fn stray(line: &str) -> Self {
        Self::glyph_line(FragmentKind::Stray, WARNING_GLYPH, line)
    }

    #[must_use]
    pub fn transport_error(message: &str) -> Self {
        Self::new(
            FragmentKind::TransportError,
            truncate_chars(message, MAX_FIELD_CHARS).into_owned(),
        )
    }

    fn glyph_line(kind: FragmentKind, glyph: &str, content: &str) -> Self {
        let content = truncate_chars(content, MAX_FIELD_CHARS);
        let mut text = String::with_capacity(glyph.len() + content.len() + 2);
        text.push_str(glyph);
        text.push(' ');
        text.push_str(&content);
        text.push('\n');
        Self::new(kind, text)
    }
}

/// Cut `text` to its first `limit` characters plus [`TRUNCATION_MARKER`].
///
/// Counts Unicode scalar values, so the cut never splits a code point.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            Cow::Owned(out)
        }
    }
}
