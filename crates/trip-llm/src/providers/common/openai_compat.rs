//! OpenAI-compatible request serialization and stream chunk parsing.
//!
//! Builds a chat-completions JSON body without leaking internal
//! [`Message`] fields (like `id` / `created_at`), and turns SSE `data:`
//! payloads into [`LlmChunk`] fragments.

use serde::Deserialize;
use serde_json::{json, Value};

use trip_core::{Message, Role, ToolSchema};

use crate::provider::Result;
use crate::types::{FinishReason, LlmChunk, ToolCallDelta};

/// Convert internal [`Message`] values to an OpenAI-compatible JSON array.
///
/// This intentionally omits internal fields like `id` and `created_at`.
pub fn messages_to_wire_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(tool_calls) = &m.tool_calls {
                msg["tool_calls"] = json!(tool_calls);
            }

            msg
        })
        .collect()
}

/// Build a streaming chat request body.
///
/// The `tools` array is omitted entirely when no tools are offered, so the
/// follow-up request after a tool exchange cannot trigger a second round of
/// calls.
pub fn build_chat_body(model: &str, messages: &[Message], tools: &[ToolSchema]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_wire_json(messages),
        "stream": true,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools);
    }

    body
}

// --- OpenAI-compatible streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct ChatStreamChunk {
    #[allow(dead_code)]
    id: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatDelta {
    content: Option<String>,
    #[allow(dead_code)]
    role: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    index: u32,
    id: Option<String>,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    tool_type: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Convert one parsed stream chunk into fragments.
///
/// A single payload can carry both a delta and a finish reason, so this can
/// produce up to two fragments.
fn chunk_to_fragments(chunk: ChatStreamChunk) -> Vec<LlmChunk> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();

    // Content and tool call deltas are independent; a chunk carrying both
    // yields both fragments.
    if let Some(content) = choice.delta.content {
        out.push(LlmChunk::Token(content));
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        let deltas: Vec<ToolCallDelta> = tool_calls
            .into_iter()
            .map(|tc| ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name: tc.function.as_ref().and_then(|f| f.name.clone()),
                arguments: tc.function.and_then(|f| f.arguments).unwrap_or_default(),
            })
            .collect();

        if !deltas.is_empty() {
            out.push(LlmChunk::ToolCallDeltas(deltas));
        }
    }

    if let Some(reason) = choice
        .finish_reason
        .as_deref()
        .and_then(FinishReason::parse)
    {
        out.push(LlmChunk::Finish(reason));
    }

    out
}

/// Parse an SSE `data:` payload.
///
/// - `"[DONE]"` -> `[LlmChunk::Done]`
/// - Invalid JSON -> error
pub fn parse_chat_sse_data(data: &str) -> Result<Vec<LlmChunk>> {
    if data.trim() == "[DONE]" {
        return Ok(vec![LlmChunk::Done]);
    }

    let chunk: ChatStreamChunk = serde_json::from_str(data)?;
    Ok(chunk_to_fragments(chunk))
}
