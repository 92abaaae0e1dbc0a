pub mod types;

pub use types::{FunctionCall, FunctionSchema, ToolCall, ToolOutput, ToolSchema};
