pub mod error;
pub mod events;
pub mod schemas;
pub mod weather;

pub use error::CapabilityError;
pub use events::{Event, EventsProvider, EventsResponse, TicketmasterClient};
pub use schemas::{tool_schemas, GET_TICKETMASTER_EVENTS, GET_WEATHER, MAX_FORECAST_DAYS};
pub use weather::{ForecastDay, WeatherApiClient, WeatherProvider, WeatherResponse};
