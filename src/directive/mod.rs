//! Turning one chat turn into a request for the remote server.
//!
//! The newest message carries free text plus optional inline directives
//! (`prompt="..."`, `dangerously-skip-permissions=<bool>`,
//! `allowedTools=[...]`, `disallowedTools=[...]`). The session to resume is
//! recovered from the `session_id=<id>` line an earlier reply rendered.

pub mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{compose_prompt, find_session_id, parse_directives, Directives};

use crate::error::PipeError;

/// One message of the running conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Text of the message; text parts are joined with newlines, other parts
    /// are skipped.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            None => String::new(),
            Some(MessageContent::Text(text)) => text.clone(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Request body for `POST /api/claude`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(
        rename = "dangerously-skip-permissions",
        skip_serializing_if = "Option::is_none"
    )]
    pub dangerously_skip_permissions: Option<bool>,
    #[serde(rename = "allowedTools", skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(rename = "disallowedTools", skip_serializing_if = "Option::is_none")]
    pub disallowed_tools: Option<Vec<String>>,
}

impl ServerRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Session id from the most recent assistant reply that announced one.
///
/// Assistant replies without an id (a turn that failed before `init`) are
/// skipped rather than ending the search, so the conversation resumes the
/// last real session after a failed reply. The newest message is the
/// user's turn and is not searched.
#[must_use]
pub fn latest_session_id(messages: &[ChatMessage]) -> Option<String> {
    let (_, history) = messages.split_last()?;
    history
        .iter()
        .rev()
        .filter(|message| message.role == "assistant")
        .find_map(|message| find_session_id(&message.text()).map(ToString::to_string))
}

/// Build the outbound request for the newest message in `messages`.
///
/// # Errors
///
/// Returns [`PipeError::InvalidRequest`] when there are no messages or the
/// resulting prompt is blank.
pub fn build_server_request(messages: &[ChatMessage]) -> Result<ServerRequest, PipeError> {
    let Some(latest) = messages.last() else {
        return Err(PipeError::InvalidRequest("No messages provided".to_string()));
    };

    let text = latest.text();
    let directives = parse_directives(&text);
    let prompt = compose_prompt(&text, &directives);
    if prompt.trim().is_empty() {
        return Err(PipeError::InvalidRequest("Empty prompt".to_string()));
    }

    Ok(ServerRequest {
        prompt,
        session_id: latest_session_id(messages),
        dangerously_skip_permissions: directives.skip_permissions,
        allowed_tools: directives.allowed_tools,
        disallowed_tools: directives.disallowed_tools,
    })
}
