use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trip_core::{ToolCall, TurnError, TurnEvent};
use trip_llm::{FinishReason, LlmChunk, LlmStream, StreamToolAccumulator};

pub struct StreamOutput {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish: Option<FinishReason>,
}

/// Consume one model response stream.
///
/// Content tokens grow a single buffer; every time the trimmed buffer is
/// non-empty the full buffer is emitted as a snapshot, so consumers observe
/// a monotonically growing answer rather than deltas. Tool call fragments
/// feed the slot-indexed accumulator.
///
/// A stream that ends without a finish reason is treated as truncated: the
/// accumulated content stands as final, best-effort.
pub async fn consume_llm_stream(
    mut stream: LlmStream,
    event_tx: &mpsc::Sender<TurnEvent>,
    cancel_token: &CancellationToken,
) -> Result<StreamOutput, TurnError> {
    let mut content = String::new();
    let mut accumulator = StreamToolAccumulator::new();
    let mut finish = None;

    while let Some(chunk_result) = stream.next().await {
        if cancel_token.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        match chunk_result {
            Ok(LlmChunk::Token(token)) => {
                content.push_str(&token);
                if !content.trim().is_empty() {
                    let _ = event_tx
                        .send(TurnEvent::Snapshot {
                            content: content.clone(),
                        })
                        .await;
                }
            }
            Ok(LlmChunk::ToolCallDeltas(deltas)) => {
                log::debug!("received {} tool call fragment(s)", deltas.len());
                accumulator.push_deltas(&deltas);
            }
            Ok(LlmChunk::Finish(reason)) => {
                finish = Some(reason);
            }
            Ok(LlmChunk::Done) => {
                log::debug!("llm stream completed");
            }
            Err(error) => {
                let _ = event_tx
                    .send(TurnEvent::Error {
                        message: format!("Stream error: {error}"),
                    })
                    .await;
                return Err(TurnError::Llm(error.to_string()));
            }
        }
    }

    if finish.is_none() {
        log::warn!("llm stream ended without a finish reason; keeping accumulated content");
    }

    // Calls observed before the terminal chunk count even when the stream
    // was cut off by length or a content filter; arguments left half-built
    // fail reconciliation instead of being silently dropped here.
    Ok(StreamOutput {
        content,
        tool_calls: accumulator.into_tool_calls(),
        finish,
    })
}
