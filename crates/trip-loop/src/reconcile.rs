//! Merges argument fields across a turn's tool calls into one canonical
//! parameter set.
//!
//! The model sometimes echoes the same logical parameter (a city name, a
//! date) in more than one tool call. Calls are folded in ascending slot
//! order and the first non-null value seen for a key wins; later duplicates
//! are dropped.

use serde_json::{Map, Value};

use trip_core::{ToolCall, TurnError};

/// Fold every call's parsed arguments into a single parameter map.
///
/// Fails with [`TurnError::MalformedArguments`] if any call's arguments do
/// not parse as a JSON object; the turn must not dispatch partially.
pub fn reconcile(tool_calls: &[ToolCall]) -> Result<Map<String, Value>, TurnError> {
    let mut merged = Map::new();

    for call in tool_calls {
        let args: Value = serde_json::from_str(&call.function.arguments).map_err(|error| {
            TurnError::MalformedArguments(format!(
                "tool call '{}' ({}): {error}",
                call.function.name, call.id
            ))
        })?;

        let Value::Object(args) = args else {
            return Err(TurnError::MalformedArguments(format!(
                "tool call '{}' ({}): arguments are not a JSON object",
                call.function.name, call.id
            )));
        };

        for (key, value) in args {
            let replace = matches!(merged.get(&key), None | Some(Value::Null));
            if replace {
                merged.insert(key, value);
            }
        }
    }

    widen_start_date(&mut merged);
    Ok(merged)
}

/// Dates arrive from the model as calendar dates; the events capability
/// wants a full UTC timestamp.
fn widen_start_date(args: &mut Map<String, Value>) {
    let Some(value) = args.get_mut("start_date") else {
        return;
    };
    if value.is_null() {
        return;
    }

    let date = match value.as_str() {
        Some(date) => date.to_string(),
        None => value.to_string(),
    };
    *value = Value::String(format!("{date}T00:00:00Z"));
}

#[cfg(test)]
mod tests {
    use trip_core::FunctionCall;

    use super::*;

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn first_non_null_value_wins() {
        let calls = vec![
            call("call_1", "get_weather", r#"{"city":"Paris","days":3}"#),
            call(
                "call_2",
                "get_ticketmaster_events",
                r#"{"city":"Lyon","country_code":"FR"}"#,
            ),
        ];

        let merged = reconcile(&calls).unwrap();

        assert_eq!(merged["city"], "Paris");
        assert_eq!(merged["days"], 3);
        assert_eq!(merged["country_code"], "FR");
    }

    #[test]
    fn null_values_are_overwritten_by_later_slots() {
        let calls = vec![
            call("call_1", "get_weather", r#"{"city":null}"#),
            call("call_2", "get_ticketmaster_events", r#"{"city":"Paris"}"#),
        ];

        let merged = reconcile(&calls).unwrap();
        assert_eq!(merged["city"], "Paris");
    }

    #[test]
    fn start_date_is_widened_to_utc_timestamp() {
        let calls = vec![call(
            "call_1",
            "get_ticketmaster_events",
            r#"{"start_date":"2026-08-23"}"#,
        )];

        let merged = reconcile(&calls).unwrap();
        assert_eq!(merged["start_date"], "2026-08-23T00:00:00Z");
    }

    #[test]
    fn null_start_date_is_left_alone() {
        let calls = vec![call(
            "call_1",
            "get_ticketmaster_events",
            r#"{"start_date":null}"#,
        )];

        let merged = reconcile(&calls).unwrap();
        assert_eq!(merged["start_date"], Value::Null);
    }

    #[test]
    fn unparseable_arguments_fail_the_turn() {
        let calls = vec![
            call("call_1", "get_weather", r#"{"city":"Paris"}"#),
            call("call_2", "get_ticketmaster_events", r#"{"city": "Par"#),
        ];

        let error = reconcile(&calls).unwrap_err();
        assert!(matches!(error, TurnError::MalformedArguments(_)));
    }

    #[test]
    fn non_object_arguments_fail_the_turn() {
        let calls = vec![call("call_1", "get_weather", r#"["Paris"]"#)];

        let error = reconcile(&calls).unwrap_err();
        assert!(matches!(error, TurnError::MalformedArguments(_)));
    }

    #[test]
    fn empty_call_list_yields_empty_map() {
        let merged = reconcile(&[]).unwrap();
        assert!(merged.is_empty());
    }
}
