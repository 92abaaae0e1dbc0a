//! Tool schema declarations exposed to the model.

use serde_json::json;

use trip_core::{FunctionSchema, ToolSchema};

pub const GET_WEATHER: &str = "get_weather";
pub const GET_TICKETMASTER_EVENTS: &str = "get_ticketmaster_events";

/// Forecast horizon supported by the weather provider.
pub const MAX_FORECAST_DAYS: u8 = 14;

/// The two capabilities offered to the model on the first pass of a turn.
pub fn tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: GET_WEATHER.to_string(),
                description:
                    "Get the current weather and forecast for the destination city.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "city": {
                            "type": "string",
                            "description": "The city for which the weather is being requested."
                        },
                        "days": {
                            "type": "integer",
                            "description": "The number of days for the weather forecast (1 to 14)."
                        }
                    },
                    "required": ["city", "days"],
                    "additionalProperties": false
                }),
            },
        },
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: GET_TICKETMASTER_EVENTS.to_string(),
                description: "Fetch upcoming events from Ticketmaster.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "city": {
                            "type": "string",
                            "description": "City where the events are searched."
                        },
                        "country_code": {
                            "type": "string",
                            "description": "ISO Alpha-2 country code for filtering results."
                        },
                        "keywords": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Optional keywords for event search (e.g., 'music', 'concert')."
                        },
                        "size": {
                            "type": "integer",
                            "description": "Number of events to fetch."
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Start date for the event search."
                        }
                    },
                    "required": ["city", "country_code", "size", "start_date"],
                    "additionalProperties": false
                }),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_exactly_two_capabilities() {
        let schemas = tool_schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].function.name, GET_WEATHER);
        assert_eq!(schemas[1].function.name, GET_TICKETMASTER_EVENTS);
    }

    #[test]
    fn schemas_serialize_to_openai_tool_shape() {
        let json = serde_json::to_value(tool_schemas()).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["parameters"]["required"][0], "city");
        assert_eq!(
            json[1]["function"]["parameters"]["properties"]["keywords"]["type"],
            "array"
        );
    }
}
