use std::collections::HashMap;

use uuid::Uuid;

use trip_core::{FunctionCall, ToolCall};

use crate::types::ToolCallDelta;

/// Accumulates streaming tool call fragments into complete tool calls.
///
/// The model can send one tool call across many streaming chunks:
/// - the slot's first chunk usually carries its id and function name
/// - subsequent chunks carry only argument fragments
///
/// Fragments for different slots arrive interleaved, so accumulation is
/// keyed by the slot index. The id and name are set once and never
/// overwritten; argument fragments are always appended, never replaced.
#[derive(Debug, Default)]
pub struct StreamToolAccumulator {
    slots: HashMap<u32, SlotRecord>,
}

#[derive(Debug, Default, Clone)]
struct SlotRecord {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl StreamToolAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of fragments into the accumulated state.
    pub fn push_deltas(&mut self, deltas: &[ToolCallDelta]) {
        for delta in deltas {
            let slot = self.slots.entry(delta.index).or_default();

            if slot.id.is_none() {
                if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
                    slot.id = Some(id.to_string());
                }
            }
            if slot.name.is_none() {
                if let Some(name) = delta.name.as_deref().filter(|name| !name.is_empty()) {
                    slot.name = Some(name.to_string());
                }
            }
            slot.arguments.push_str(&delta.arguments);
        }
    }

    /// Convert the accumulated slots into complete tool calls, sorted by
    /// slot index.
    ///
    /// Slots that never received a function name are dropped; a slot that
    /// never received an id gets one synthesized so every finalized call can
    /// be answered by a result.
    pub fn into_tool_calls(self) -> Vec<ToolCall> {
        let mut slots: Vec<_> = self.slots.into_iter().collect();
        slots.sort_by_key(|(index, _)| *index);

        slots
            .into_iter()
            .filter_map(|(_, slot)| {
                let name = slot.name?;
                Some(ToolCall {
                    id: slot
                        .id
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                    tool_type: "function".to_string(),
                    function: FunctionCall {
                        name,
                        arguments: slot.arguments,
                    },
                })
            })
            .collect()
    }

    pub fn has_calls(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
