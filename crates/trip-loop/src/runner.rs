//! Drives one conversation turn end to end.
//!
//! A turn has at most two model passes. The first pass offers the tool
//! schemas; if the model answers directly the turn ends there. If it calls
//! tools instead, the calls are reconciled, dispatched, and their outputs
//! fed into a second pass that offers no tools, forcing a final answer.
//!
//! History is only mutated after the whole turn succeeds, so a failed turn
//! leaves the conversation exactly as it was.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trip_core::{Message, ToolSchema, TurnError, TurnEvent};
use trip_llm::{LlmProvider, LlmStream};

use crate::config::TurnConfig;
use crate::dispatch::{dispatch, Capabilities};
use crate::prompt::build_system_prompt;
use crate::reconcile::reconcile;
use crate::stream::consume_llm_stream;

pub async fn run_turn(
    history: &mut Vec<Message>,
    user_message: String,
    event_tx: mpsc::Sender<TurnEvent>,
    llm: Arc<dyn LlmProvider>,
    capabilities: Arc<Capabilities>,
    cancel_token: CancellationToken,
    config: &TurnConfig,
) -> Result<(), TurnError> {
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| build_system_prompt(config.max_activities));
    let user_msg = Message::user(user_message);

    let mut request = Vec::with_capacity(history.len() + 2);
    request.push(Message::system(system_prompt));
    request.extend(history.iter().cloned());
    request.push(user_msg.clone());

    let schemas = trip_tools::tool_schemas();
    let stream = open_stream(&*llm, &request, &schemas, config, &event_tx).await?;
    let first = consume_llm_stream(stream, &event_tx, &cancel_token).await?;

    if first.tool_calls.is_empty() {
        log::debug!("turn finished without tool calls");
        history.push(user_msg);
        history.push(Message::assistant(first.content, None));
        let _ = event_tx.send(TurnEvent::Complete).await;
        return Ok(());
    }

    log::info!("model requested {} tool call(s)", first.tool_calls.len());

    let args = match reconcile(&first.tool_calls) {
        Ok(args) => args,
        Err(error) => {
            let _ = event_tx
                .send(TurnEvent::Error {
                    message: error.to_string(),
                })
                .await;
            return Err(error);
        }
    };

    let outputs = dispatch(
        &first.tool_calls,
        &args,
        &capabilities,
        config.capability_timeout,
        &event_tx,
    )
    .await;

    let assistant_msg = Message::assistant(first.content, Some(first.tool_calls));
    let tool_messages: Vec<Message> = outputs
        .into_iter()
        .map(|output| Message::tool_result(output.tool_call_id, output.content.to_string()))
        .collect();

    request.push(assistant_msg.clone());
    request.extend(tool_messages.iter().cloned());

    // Second pass: no tools offered, the model must answer in prose.
    let stream = open_stream(&*llm, &request, &[], config, &event_tx).await?;
    let second = consume_llm_stream(stream, &event_tx, &cancel_token).await?;

    history.push(user_msg);
    history.push(assistant_msg);
    history.extend(tool_messages);
    history.push(Message::assistant(second.content, None));
    let _ = event_tx.send(TurnEvent::Complete).await;
    Ok(())
}

async fn open_stream(
    llm: &dyn LlmProvider,
    messages: &[Message],
    tools: &[ToolSchema],
    config: &TurnConfig,
    event_tx: &mpsc::Sender<TurnEvent>,
) -> Result<LlmStream, TurnError> {
    match llm.chat_stream(messages, tools, config.model.as_deref()).await {
        Ok(stream) => Ok(stream),
        Err(error) => {
            let _ = event_tx
                .send(TurnEvent::Error {
                    message: format!("LLM request failed: {error}"),
                })
                .await;
            Err(TurnError::Llm(error.to_string()))
        }
    }
}

/// Run one turn over a snapshot of the history and expose the growing
/// answer as a stream of full-text snapshots.
///
/// Dropping the returned stream cancels the turn. Callers who need the
/// updated history should use [`run_turn`] directly.
pub fn turn_stream(
    history: Vec<Message>,
    user_message: String,
    llm: Arc<dyn LlmProvider>,
    capabilities: Arc<Capabilities>,
    config: TurnConfig,
) -> Pin<Box<dyn Stream<Item = Result<String, TurnError>> + Send>> {
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let cancel_token = CancellationToken::new();
    let task_cancel = cancel_token.clone();

    let handle = tokio::spawn(async move {
        let mut history = history;
        run_turn(
            &mut history,
            user_message,
            event_tx,
            llm,
            capabilities,
            task_cancel,
            &config,
        )
        .await
    });

    Box::pin(async_stream::stream! {
        let _guard = cancel_token.drop_guard();

        while let Some(event) = event_rx.recv().await {
            if let TurnEvent::Snapshot { content } = event {
                yield Ok(content);
            }
        }

        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => yield Err(error),
            Err(join_error) => {
                yield Err(TurnError::Llm(format!("turn task failed: {join_error}")));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::{stream, StreamExt};
    use serde_json::json;

    use trip_core::Role;
    use trip_llm::{FinishReason, LlmChunk, LlmError, ToolCallDelta};
    use trip_tools::{
        EventsProvider, EventsResponse, WeatherProvider, WeatherResponse,
        GET_TICKETMASTER_EVENTS, GET_WEATHER,
    };

    use super::*;

    struct RecordedRequest {
        messages: Vec<Message>,
        tools_offered: usize,
    }

    /// Plays back a queue of scripted streams, one per `chat_stream` call.
    struct ScriptedLlm {
        scripts: Mutex<VecDeque<Vec<trip_llm::provider::Result<LlmChunk>>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl ScriptedLlm {
        fn new(scripts: Vec<Vec<trip_llm::provider::Result<LlmChunk>>>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<RecordedRequest> {
            std::mem::take(&mut self.requests.lock().unwrap())
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat_stream(
            &self,
            messages: &[Message],
            tools: &[ToolSchema],
            _model: Option<&str>,
        ) -> trip_llm::provider::Result<LlmStream> {
            self.requests.lock().unwrap().push(RecordedRequest {
                messages: messages.to_vec(),
                tools_offered: tools.len(),
            });

            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Api("no scripted response left".to_string()))?;
            Ok(Box::pin(stream::iter(script)) as LlmStream)
        }
    }

    struct CountingWeather {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingWeather {
        async fn get_weather(&self, city: &str, _days: u8) -> WeatherResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            WeatherResponse::Forecast {
                city: city.to_string(),
                forecast: Vec::new(),
            }
        }
    }

    struct CountingEvents {
        calls: AtomicUsize,
        response: EventsResponse,
    }

    #[async_trait]
    impl EventsProvider for CountingEvents {
        async fn get_events(
            &self,
            _city: &str,
            _country_code: &str,
            _keywords: &[String],
            _start_date: &str,
        ) -> EventsResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn capabilities(weather: Arc<CountingWeather>) -> Arc<Capabilities> {
        Arc::new(Capabilities {
            weather,
            events: Arc::new(CountingEvents {
                calls: AtomicUsize::new(0),
                response: EventsResponse::Events(Vec::new()),
            }),
        })
    }

    fn weather_counter() -> Arc<CountingWeather> {
        Arc::new(CountingWeather {
            calls: AtomicUsize::new(0),
        })
    }

    fn config() -> TurnConfig {
        TurnConfig {
            capability_timeout: Duration::from_secs(1),
            ..TurnConfig::default()
        }
    }

    fn weather_call_script(id: &str) -> Vec<trip_llm::provider::Result<LlmChunk>> {
        vec![
            Ok(LlmChunk::ToolCallDeltas(vec![ToolCallDelta {
                index: 0,
                id: Some(id.to_string()),
                name: Some(GET_WEATHER.to_string()),
                arguments: json!({"city": "Paris", "days": 2}).to_string(),
            }])),
            Ok(LlmChunk::Finish(FinishReason::ToolCalls)),
            Ok(LlmChunk::Done),
        ]
    }

    fn answer_script(text: &str) -> Vec<trip_llm::provider::Result<LlmChunk>> {
        vec![
            Ok(LlmChunk::Token(text.to_string())),
            Ok(LlmChunk::Finish(FinishReason::Stop)),
            Ok(LlmChunk::Done),
        ]
    }

    #[tokio::test]
    async fn content_only_turn_makes_one_pass() {
        let llm = Arc::new(ScriptedLlm::new(vec![answer_script("Bonjour!")]));
        let weather = weather_counter();
        let mut history = Vec::new();
        let (event_tx, _event_rx) = mpsc::channel(64);

        run_turn(
            &mut history,
            "hello".to_string(),
            event_tx,
            llm.clone(),
            capabilities(weather.clone()),
            CancellationToken::new(),
            &config(),
        )
        .await
        .expect("turn should succeed");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Bonjour!");
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools_offered, 2);
        assert_eq!(requests[0].messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn tool_turn_dispatches_then_answers_without_tools() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            weather_call_script("call_1"),
            answer_script("It will be sunny in Paris."),
        ]));
        let weather = weather_counter();
        let mut history = Vec::new();
        let (event_tx, mut event_rx) = mpsc::channel(64);

        run_turn(
            &mut history,
            "weather in Paris?".to_string(),
            event_tx,
            llm.clone(),
            capabilities(weather.clone()),
            CancellationToken::new(),
            &config(),
        )
        .await
        .expect("turn should succeed");

        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);

        // user, assistant-with-calls, tool result, final assistant
        assert_eq!(history.len(), 4);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].tool_calls.as_ref().map(Vec::len), Some(1));
        assert_eq!(history[2].role, Role::Tool);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[3].content, "It will be sunny in Paris.");

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].tools_offered, 0);
        assert!(requests[1]
            .messages
            .iter()
            .any(|message| message.role == Role::Tool));

        let mut saw_complete = false;
        while let Ok(event) = event_rx.try_recv() {
            if matches!(event, TurnEvent::Complete) {
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn duplicate_tool_calls_each_get_a_result_message() {
        let first_pass = vec![
            Ok(LlmChunk::ToolCallDeltas(vec![
                ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some(GET_WEATHER.to_string()),
                    arguments: json!({"city": "Paris", "days": 2}).to_string(),
                },
                ToolCallDelta {
                    index: 1,
                    id: Some("call_2".to_string()),
                    name: Some(GET_WEATHER.to_string()),
                    arguments: json!({"city": null, "days": null}).to_string(),
                },
            ])),
            Ok(LlmChunk::Finish(FinishReason::ToolCalls)),
        ];
        let llm = Arc::new(ScriptedLlm::new(vec![
            first_pass,
            answer_script("Here you go."),
        ]));
        let weather = weather_counter();
        let mut history = Vec::new();
        let (event_tx, _event_rx) = mpsc::channel(64);

        run_turn(
            &mut history,
            "weather twice".to_string(),
            event_tx,
            llm,
            capabilities(weather.clone()),
            CancellationToken::new(),
            &config(),
        )
        .await
        .expect("turn should succeed");

        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);

        // user, assistant, two tool results, final assistant
        assert_eq!(history.len(), 5);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[3].tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn interleaved_calls_to_both_capabilities_each_get_one_result() {
        // Fragments for the two calls arrive a few characters at a time,
        // interleaved across slots.
        let fragment = |index: u32, id: Option<&str>, name: Option<&str>, piece: &str| {
            Ok(LlmChunk::ToolCallDeltas(vec![ToolCallDelta {
                index,
                id: id.map(String::from),
                name: name.map(String::from),
                arguments: piece.to_string(),
            }]))
        };
        let first_pass = vec![
            fragment(0, Some("call_1"), Some(GET_WEATHER), "{\"city\":"),
            fragment(1, Some("call_2"), Some(GET_TICKETMASTER_EVENTS), "{\"coun"),
            fragment(0, None, None, "\"Paris\","),
            fragment(1, None, None, "try_code\":\"FR\","),
            fragment(0, None, None, "\"days\":2}"),
            fragment(1, None, None, "\"start_date\":\"2026-08-24\"}"),
            Ok(LlmChunk::Finish(FinishReason::ToolCalls)),
        ];
        let llm = Arc::new(ScriptedLlm::new(vec![
            first_pass,
            answer_script("Weather and events coming up."),
        ]));

        let weather = weather_counter();
        let events = Arc::new(CountingEvents {
            calls: AtomicUsize::new(0),
            response: EventsResponse::Events(vec![trip_tools::Event {
                name: "Jazz Night".to_string(),
                date: "2026-08-24".to_string(),
                venue: "Le Club".to_string(),
                url: "https://example.com/jazz".to_string(),
            }]),
        });
        let capabilities = Arc::new(Capabilities {
            weather: weather.clone(),
            events: events.clone(),
        });

        let mut history = Vec::new();
        let (event_tx, _event_rx) = mpsc::channel(64);

        run_turn(
            &mut history,
            "what's on in Paris?".to_string(),
            event_tx,
            llm,
            capabilities,
            CancellationToken::new(),
            &config(),
        )
        .await
        .expect("turn should succeed");

        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.calls.load(Ordering::SeqCst), 1);

        // user, assistant with both calls, one tool result each, final answer
        assert_eq!(history.len(), 5);
        assert_eq!(history[1].tool_calls.as_ref().map(Vec::len), Some(2));
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[3].tool_call_id.as_deref(), Some("call_2"));
        assert!(history[3].content.contains("Jazz Night"));
    }

    #[tokio::test]
    async fn malformed_arguments_abort_without_touching_history() {
        let first_pass = vec![
            Ok(LlmChunk::ToolCallDeltas(vec![ToolCallDelta {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some(GET_WEATHER.to_string()),
                arguments: "{\"city\": \"Par".to_string(),
            }])),
            Ok(LlmChunk::Finish(FinishReason::ToolCalls)),
        ];
        let llm = Arc::new(ScriptedLlm::new(vec![first_pass]));
        let weather = weather_counter();
        let mut history = vec![Message::user("earlier"), Message::assistant("hi", None)];
        let (event_tx, _event_rx) = mpsc::channel(64);

        let result = run_turn(
            &mut history,
            "weather?".to_string(),
            event_tx,
            llm,
            capabilities(weather.clone()),
            CancellationToken::new(),
            &config(),
        )
        .await;

        assert!(matches!(result, Err(TurnError::MalformedArguments(_))));
        assert_eq!(history.len(), 2);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn llm_failure_leaves_history_untouched() {
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let mut history = vec![Message::user("earlier")];
        let (event_tx, mut event_rx) = mpsc::channel(64);

        let result = run_turn(
            &mut history,
            "hello".to_string(),
            event_tx,
            llm,
            capabilities(weather_counter()),
            CancellationToken::new(),
            &config(),
        )
        .await;

        assert!(matches!(result, Err(TurnError::Llm(_))));
        assert_eq!(history.len(), 1);
        assert!(matches!(
            event_rx.try_recv(),
            Ok(TurnEvent::Error { .. })
        ));
    }

    #[tokio::test]
    async fn turn_stream_yields_growing_snapshots() {
        let script = vec![
            Ok(LlmChunk::Token("Bon".to_string())),
            Ok(LlmChunk::Token("jour!".to_string())),
            Ok(LlmChunk::Finish(FinishReason::Stop)),
        ];
        let llm = Arc::new(ScriptedLlm::new(vec![script]));

        let stream = turn_stream(
            Vec::new(),
            "hello".to_string(),
            llm,
            capabilities(weather_counter()),
            config(),
        );

        let snapshots: Vec<String> = stream
            .map(|item| item.expect("turn should succeed"))
            .collect()
            .await;

        assert_eq!(snapshots, vec!["Bon".to_string(), "Bonjour!".to_string()]);
    }

    #[tokio::test]
    async fn turn_stream_surfaces_turn_errors() {
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));

        let mut stream = turn_stream(
            Vec::new(),
            "hello".to_string(),
            llm,
            capabilities(weather_counter()),
            config(),
        );

        let item = stream.next().await;
        assert!(matches!(item, Some(Err(TurnError::Llm(_)))));
    }
}
