use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use trip_core::{Message, ToolSchema};

use crate::types::LlmChunk;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmChunk>> + Send>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a chat completion.
    ///
    /// # Arguments
    /// * `messages` - Chat messages
    /// * `tools` - Tool schemas offered to the model (empty = none offered)
    /// * `model` - Optional model override. If None, uses the provider's default model
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<LlmStream>;
}
