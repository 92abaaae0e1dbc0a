use serde::{Deserialize, Serialize};

/// Events emitted while a conversation turn runs.
///
/// `Snapshot` carries the full answer-so-far, not a delta: consumers can
/// render each snapshot as-is without stitching pieces together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Snapshot {
        content: String,
    },

    ToolStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    ToolComplete {
        tool_call_id: String,
        content: serde_json::Value,
    },

    Complete,

    Error {
        message: String,
    },
}
