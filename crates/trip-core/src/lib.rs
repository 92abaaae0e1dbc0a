pub mod chat;
pub mod tools;

pub use chat::error::TurnError;
pub use chat::events::TurnEvent;
pub use chat::types::{Message, Role};
pub use tools::{FunctionCall, FunctionSchema, ToolCall, ToolOutput, ToolSchema};
