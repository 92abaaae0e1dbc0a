//! Shared SSE -> [`LlmStream`] adapter.

use eventsource_stream::Eventsource;
use futures::stream;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LlmError, LlmStream, Result};
use crate::types::LlmChunk;

fn to_stream_error(err: LlmError) -> LlmError {
    match err {
        LlmError::Stream(msg) => LlmError::Stream(msg),
        other => LlmError::Stream(other.to_string()),
    }
}

/// Convert an SSE HTTP [`Response`] into an [`LlmStream`].
///
/// `handler` receives the SSE event name and data payload for each event and
/// returns the fragments parsed from it (possibly none); handler errors are
/// mapped to `LlmError::Stream`.
pub fn llm_stream_from_sse<H>(response: Response, mut handler: H) -> LlmStream
where
    H: FnMut(&str, &str) -> Result<Vec<LlmChunk>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            handler(event.event.as_str(), event.data.as_str()).map_err(to_stream_error)
        })
        .flat_map(|result| match result {
            Ok(chunks) => stream::iter(chunks.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(err) => stream::iter(vec![Err(err)]),
        });

    Box::pin(stream)
}
