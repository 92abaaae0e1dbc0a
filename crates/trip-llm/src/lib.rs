pub mod accumulator;
pub mod provider;
pub mod providers;
pub mod types;

pub use accumulator::StreamToolAccumulator;
pub use provider::{LlmError, LlmProvider, LlmStream};
pub use providers::OpenAiProvider;
pub use types::{FinishReason, LlmChunk, ToolCallDelta};
