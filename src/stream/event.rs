//! Typed events carried on the remote server's `data:` lines.
//!
//! Decoding goes through [`serde_json::Value`] first so that an unrecognized
//! `type` lands in [`InboundEvent::Unknown`] instead of failing, while a known
//! `type` with a malformed payload still surfaces as a decode error.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const STOP_REASON_END_TURN: &str = "end_turn";
pub const SUBTYPE_INIT: &str = "init";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    System(SystemEvent),
    Assistant(AssistantEvent),
    User(UserEvent),
    Result(ResultEvent),
    Error(ErrorEvent),
    /// Anything else, kept whole for pass-through.
    Unknown(Value),
}

#[derive(Clone, Copy)]
enum EventTag {
    System,
    Assistant,
    User,
    Result,
    Error,
}

impl EventTag {
    fn from_type(value: &Value) -> Option<Self> {
        match value.get("type").and_then(Value::as_str)? {
            "system" => Some(Self::System),
            "assistant" => Some(Self::Assistant),
            "user" => Some(Self::User),
            "result" => Some(Self::Result),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl InboundEvent {
    /// Decode one parsed stream payload.
    ///
    /// # Errors
    ///
    /// Returns the serde error when a recognized `type` carries a payload of
    /// the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let Some(tag) = EventTag::from_type(&value) else {
            return Ok(Self::Unknown(value));
        };
        match tag {
            EventTag::System => serde_json::from_value(value).map(Self::System),
            EventTag::Assistant => serde_json::from_value(value).map(Self::Assistant),
            EventTag::User => serde_json::from_value(value).map(Self::User),
            EventTag::Result => serde_json::from_value(value).map(Self::Result),
            EventTag::Error => serde_json::from_value(value).map(Self::Error),
        }
    }

    /// Wire name of the event, for logging.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::System(_) => "system",
            Self::Assistant(_) => "assistant",
            Self::User(_) => "user",
            Self::Result(_) => "result",
            Self::Error(_) => "error",
            Self::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("untyped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemEvent {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SystemEvent {
    /// Session id announced by an `init` event, if this is one.
    #[must_use]
    pub fn init_session_id(&self) -> Option<&str> {
        if self.subtype.as_deref() != Some(SUBTYPE_INIT) {
            return None;
        }
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: AssistantMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default, deserialize_with = "content_items")]
    pub content: Vec<AssistantContent>,
}

impl AssistantMessage {
    #[must_use]
    pub fn is_end_turn(&self) -> bool {
        self.stop_reason.as_deref() == Some(STOP_REASON_END_TURN)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum AssistantContent {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: UserMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserMessage {
    #[serde(default, deserialize_with = "content_items")]
    pub content: Vec<UserContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum UserContent {
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "null_as_default")]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub error: Value,
}

impl ErrorEvent {
    #[must_use]
    pub fn message(&self) -> String {
        match &self.error {
            Value::Null => "unknown error".to_string(),
            other => value_text(other),
        }
    }
}

/// Text form of a JSON value: strings unquoted, everything else compact JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Text of a `tool_result` content value.
///
/// The server sends either a plain string or a list of `{"type":"text"}`
/// blocks; other shapes fall back to compact JSON.
#[must_use]
pub fn tool_result_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let texts: Option<Vec<&str>> = items
                .iter()
                .map(|item| item.get("text").and_then(Value::as_str))
                .collect();
            match texts {
                Some(texts) => texts.join("\n"),
                None => content.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Message content is a list of typed items; a bare string (a plain prompt
/// echo) or `null` carries nothing to render.
fn content_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => {
            serde_json::from_value(Value::Array(items)).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}
