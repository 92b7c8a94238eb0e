use std::sync::LazyLock;

use regex_lite::Regex;

static SESSION_ID_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"session_id=([a-f0-9-]+)").ok());
static SKIP_PERMISSIONS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"dangerously-skip-permissions=(\w+)").ok());
static ALLOWED_TOOLS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\ballowedTools=\[([^\]]+)\]").ok());
static DISALLOWED_TOOLS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bdisallowedTools=\[([^\]]+)\]").ok());
static PROMPT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"prompt="([^"]+)""#).ok());
static ANY_DIRECTIVE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(dangerously-skip-permissions=\w+|\ballowedTools=\[[^\]]+\]|\bdisallowedTools=\[[^\]]+\]|prompt="[^"]+")\s*"#,
    )
    .ok()
});

/// Directives embedded in a user message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// `prompt="..."`
    pub prompt: Option<String>,
    /// `dangerously-skip-permissions=<bool>`
    pub skip_permissions: Option<bool>,
    /// `allowedTools=[...]`
    pub allowed_tools: Option<Vec<String>>,
    /// `disallowedTools=[...]`
    pub disallowed_tools: Option<Vec<String>>,
}

fn first_capture<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<&'t str> {
    let re = LazyLock::force(re).as_ref()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract every directive from `text`. The first occurrence of each wins.
#[must_use]
pub fn parse_directives(text: &str) -> Directives {
    Directives {
        prompt: first_capture(&PROMPT_RE, text).map(ToString::to_string),
        skip_permissions: first_capture(&SKIP_PERMISSIONS_RE, text)
            .map(|value| value.eq_ignore_ascii_case("true")),
        allowed_tools: first_capture(&ALLOWED_TOOLS_RE, text).and_then(parse_tool_list),
        disallowed_tools: first_capture(&DISALLOWED_TOOLS_RE, text).and_then(parse_tool_list),
    }
}

/// Split a bracketed tool list body: `Bash, "Read", 'Edit'`.
///
/// Returns `None` when nothing remains after trimming.
fn parse_tool_list(body: &str) -> Option<Vec<String>> {
    let tools: Vec<String> = body
        .split(',')
        .map(|tool| tool.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|tool| !tool.is_empty())
        .map(ToString::to_string)
        .collect();
    (!tools.is_empty()).then_some(tools)
}

/// Prompt to send for `text`.
///
/// An explicit `prompt="..."` wins. Otherwise all directives are removed;
/// if nothing is left the original text is used as-is.
#[must_use]
pub fn compose_prompt(text: &str, directives: &Directives) -> String {
    if let Some(prompt) = &directives.prompt {
        return prompt.clone();
    }
    let stripped = match LazyLock::force(&ANY_DIRECTIVE_RE).as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => text.into(),
    };
    let stripped = stripped.trim();
    if stripped.is_empty() {
        text.to_string()
    } else {
        stripped.to_string()
    }
}

/// Session id announced in an assistant reply (`session_id=<id>`).
#[must_use]
pub fn find_session_id(text: &str) -> Option<&str> {
    first_capture(&SESSION_ID_RE, text)
}
