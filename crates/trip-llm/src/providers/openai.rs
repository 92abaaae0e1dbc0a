use async_trait::async_trait;
use reqwest::Client;

use trip_core::{Message, ToolSchema};

use crate::provider::{LlmError, LlmProvider, LlmStream, Result};
use crate::types::LlmChunk;

use super::common::openai_compat::{build_chat_body, parse_chat_sse_data};
use super::common::sse::llm_stream_from_sse;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<LlmStream> {
        let model_to_use = model.unwrap_or(&self.model);

        let body = build_chat_body(model_to_use, messages, tools);

        log::debug!(
            "requesting chat completion: model={}, {} messages, {} tools",
            model_to_use,
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(LlmError::Api(format!("HTTP {}: {}", status, text)));
        }

        let stream = llm_stream_from_sse(response, |_event, data| {
            if data.trim().is_empty() {
                return Ok(Vec::new());
            }

            let chunks = parse_chat_sse_data(data)?;
            Ok(chunks
                .into_iter()
                .filter(|chunk| !matches!(chunk, LlmChunk::Done))
                .collect())
        });

        Ok(stream)
    }
}
