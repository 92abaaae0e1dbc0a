//! Executes the capabilities a turn's tool calls ask for.
//!
//! Each distinct capability runs once per turn, even when the model emits
//! several calls to it. Every tool call still receives its own output, so
//! the follow-up request carries exactly one result message per call id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use trip_core::{ToolCall, ToolOutput, TurnEvent};
use trip_tools::{
    EventsProvider, EventsResponse, WeatherProvider, WeatherResponse, GET_TICKETMASTER_EVENTS,
    GET_WEATHER, MAX_FORECAST_DAYS,
};

const WEATHER_UNAVAILABLE: &str = "No weather data available for this location.";
const EVENTS_UNAVAILABLE: &str = "No events found for this location.";

/// The external lookups available to a turn.
pub struct Capabilities {
    pub weather: Arc<dyn WeatherProvider>,
    pub events: Arc<dyn EventsProvider>,
}

/// Run the capabilities named by `tool_calls` against the reconciled
/// argument map and produce one output per call.
///
/// Provider failures and timeouts never abort the turn; they surface as an
/// in-band message payload the model can relay to the user.
pub async fn dispatch(
    tool_calls: &[ToolCall],
    args: &Map<String, Value>,
    capabilities: &Capabilities,
    timeout: Duration,
    event_tx: &mpsc::Sender<TurnEvent>,
) -> Vec<ToolOutput> {
    let mut names: Vec<&str> = Vec::new();
    for call in tool_calls {
        if !names.contains(&call.function.name.as_str()) {
            names.push(&call.function.name);
        }
    }

    for call in tool_calls {
        let _ = event_tx
            .send(TurnEvent::ToolStart {
                tool_call_id: call.id.clone(),
                tool_name: call.function.name.clone(),
                arguments: Value::Object(args.clone()),
            })
            .await;
    }

    let results = join_all(
        names
            .iter()
            .map(|name| run_capability(name, args, capabilities, timeout)),
    )
    .await;

    let by_name: HashMap<&str, Value> = names.into_iter().zip(results).collect();

    let mut outputs = Vec::with_capacity(tool_calls.len());
    for call in tool_calls {
        // Every name is in the map; the fallback only guards map lookups.
        let content = by_name
            .get(call.function.name.as_str())
            .cloned()
            .unwrap_or_else(|| {
                json!({"message": format!("The '{}' capability is not available.", call.function.name)})
            });

        let _ = event_tx
            .send(TurnEvent::ToolComplete {
                tool_call_id: call.id.clone(),
                content: content.clone(),
            })
            .await;

        outputs.push(ToolOutput {
            tool_call_id: call.id.clone(),
            content,
        });
    }

    outputs
}

async fn run_capability(
    name: &str,
    args: &Map<String, Value>,
    capabilities: &Capabilities,
    timeout: Duration,
) -> Value {
    match name {
        GET_WEATHER => run_weather(args, capabilities, timeout).await,
        GET_TICKETMASTER_EVENTS => run_events(args, capabilities, timeout).await,
        other => {
            log::warn!("model requested unknown capability '{other}'");
            json!({"message": format!("The '{other}' capability is not available.")})
        }
    }
}

async fn run_weather(
    args: &Map<String, Value>,
    capabilities: &Capabilities,
    timeout: Duration,
) -> Value {
    let city = args.get("city").and_then(Value::as_str).unwrap_or_default();
    let days = args
        .get("days")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .min(MAX_FORECAST_DAYS as u64) as u8;

    match tokio::time::timeout(timeout, capabilities.weather.get_weather(city, days)).await {
        Ok(WeatherResponse::Forecast { forecast, .. }) => json!({"weather": forecast}),
        Ok(WeatherResponse::Error { error }) => {
            log::warn!("weather lookup failed: {error}");
            json!({"message": WEATHER_UNAVAILABLE})
        }
        Err(_) => {
            log::warn!("weather lookup timed out after {timeout:?}");
            json!({"message": WEATHER_UNAVAILABLE})
        }
    }
}

async fn run_events(
    args: &Map<String, Value>,
    capabilities: &Capabilities,
    timeout: Duration,
) -> Value {
    let city = args.get("city").and_then(Value::as_str).unwrap_or_default();
    let country_code = args
        .get("country_code")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let keywords: Vec<String> = args
        .get("keywords")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let start_date = args
        .get("start_date")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let lookup = capabilities
        .events
        .get_events(city, country_code, &keywords, start_date);

    match tokio::time::timeout(timeout, lookup).await {
        Ok(EventsResponse::Events(events)) if !events.is_empty() => json!({"events": events}),
        Ok(EventsResponse::Events(_)) => {
            log::info!("no events found for {city}");
            json!({"message": EVENTS_UNAVAILABLE})
        }
        Ok(EventsResponse::Error { error }) => {
            log::warn!("events lookup failed: {error}");
            json!({"message": EVENTS_UNAVAILABLE})
        }
        Err(_) => {
            log::warn!("events lookup timed out after {timeout:?}");
            json!({"message": EVENTS_UNAVAILABLE})
        }
    }
}
