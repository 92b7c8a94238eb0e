use serde_json::{json, Value};

use crate::util::{push_json_string_escaped, push_u64_decimal};

pub(crate) const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Identity shared by every chunk of one completion.
#[derive(Debug, Clone)]
pub(crate) struct CompletionMeta {
    pub id: String,
    pub model: String,
    pub created: u64,
}

fn push_chunk_prefix(out: &mut String, meta: &CompletionMeta) {
    out.push_str("data: {\"id\":");
    push_json_string_escaped(out, &meta.id);
    out.push_str(",\"object\":\"chat.completion.chunk\",\"created\":");
    push_u64_decimal(out, meta.created);
    out.push_str(",\"model\":");
    push_json_string_escaped(out, &meta.model);
}

/// First chunk announcing the assistant role.
pub(crate) fn encode_role_chunk(meta: &CompletionMeta) -> String {
    let mut out = String::with_capacity(160 + meta.id.len() + meta.model.len());
    push_chunk_prefix(&mut out, meta);
    out.push_str(
        ",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
    );
    out
}

/// One content delta carrying a rendered fragment.
pub(crate) fn encode_content_chunk(meta: &CompletionMeta, content: &str) -> String {
    let mut out = String::with_capacity(128 + meta.id.len() + meta.model.len() + content.len());
    push_chunk_prefix(&mut out, meta);
    out.push_str(",\"choices\":[{\"index\":0,\"delta\":{\"content\":");
    push_json_string_escaped(&mut out, content);
    out.push_str("},\"finish_reason\":null}]}\n\n");
    out
}

pub(crate) fn encode_finish_chunk(meta: &CompletionMeta) -> String {
    let mut out = String::with_capacity(128 + meta.id.len() + meta.model.len());
    push_chunk_prefix(&mut out, meta);
    out.push_str(",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    out
}

/// Non-streaming `chat.completion` body.
pub(crate) fn encode_completion(meta: &CompletionMeta, content: &str) -> Value {
    json!({
        "id": meta.id,
        "object": "chat.completion",
        "created": meta.created,
        "model": meta.model,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content,
            },
            "finish_reason": "stop",
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> CompletionMeta {
        CompletionMeta {
            id: "chatcmpl-0000000000000001".into(),
            model: "claude-code".into(),
            created: 1_700_000_000,
        }
    }

    fn frame_json(frame: &str) -> Value {
        let payload = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("sse frame");
        serde_json::from_str(payload).expect("json payload")
    }

    #[test]
    fn test_content_chunk_shape() {
        let chunk = frame_json(&encode_content_chunk(&meta(), "<thinking>\n\"q\"\n"));
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["created"], 1_700_000_000);
        assert_eq!(chunk["model"], "claude-code");
        assert_eq!(chunk["choices"][0]["delta"]["content"], "<thinking>\n\"q\"\n");
        assert!(chunk["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn test_role_and_finish_chunks() {
        let role = frame_json(&encode_role_chunk(&meta()));
        assert_eq!(role["choices"][0]["delta"]["role"], "assistant");
        let finish = frame_json(&encode_finish_chunk(&meta()));
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert_eq!(finish["choices"][0]["delta"], json!({}));
    }

    #[test]
    fn test_completion_body() {
        let body = encode_completion(&meta(), "session_id=ab\n\nhi");
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["message"]["content"], "session_id=ab\n\nhi");
    }
}
