/// One fragment of a streaming chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmChunk {
    /// A piece of assistant text.
    Token(String),
    /// Partial tool call data, possibly for several call slots at once.
    ToolCallDeltas(Vec<ToolCallDelta>),
    /// The model's terminal finish reason for this response.
    Finish(FinishReason),
    /// End-of-stream marker (`[DONE]`).
    Done,
}

/// Partial tool call data for one call slot.
///
/// `index` identifies the slot across fragments; `id` and `name` usually
/// arrive once on the slot's first fragment while `arguments` arrives in
/// pieces that must be concatenated.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stop" => Some(Self::Stop),
            "tool_calls" => Some(Self::ToolCalls),
            "length" => Some(Self::Length),
            "content_filter" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}
