use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

pub const TICKETMASTER_KEY_ENV: &str = "TICKETMASTER_KEY";

const TICKETMASTER_API_URL: &str = "https://app.ticketmaster.com/discovery/v2/events.json";
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of events requested per lookup.
pub const EVENT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub name: String,
    pub date: String,
    pub venue: String,
    pub url: String,
}

/// Event lookup result. Failures are reported in band, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EventsResponse {
    Events(Vec<Event>),
    Error { error: String },
}

#[async_trait]
pub trait EventsProvider: Send + Sync {
    async fn get_events(
        &self,
        city: &str,
        country_code: &str,
        keywords: &[String],
        start_date: &str,
    ) -> EventsResponse;
}

/// Fetches upcoming events from the Ticketmaster Discovery API.
pub struct TicketmasterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TicketmasterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: TICKETMASTER_API_URL.to_string(),
        }
    }

    /// Build a client from the `TICKETMASTER_KEY` environment variable.
    pub fn from_env() -> Result<Self, CapabilityError> {
        let api_key = std::env::var(TICKETMASTER_KEY_ENV)
            .map_err(|_| CapabilityError::MissingCredential(TICKETMASTER_KEY_ENV))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl EventsProvider for TicketmasterClient {
    async fn get_events(
        &self,
        city: &str,
        country_code: &str,
        keywords: &[String],
        start_date: &str,
    ) -> EventsResponse {
        log::debug!("fetching events for {city}, {country_code}");

        let size = EVENT_PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("apikey", self.api_key.as_str()),
            ("city", city),
            ("countryCode", country_code),
            ("size", &size),
            ("startDateTime", start_date),
        ];

        let keyword = keywords.join(",");
        if !keyword.is_empty() {
            query.push(("keyword", &keyword));
        }

        let result = self
            .client
            .get(&self.base_url)
            .query(&query)
            .timeout(API_TIMEOUT)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                return EventsResponse::Error {
                    error: format!("events request failed: {error}"),
                }
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::warn!("failed to fetch events for {city}: {status}");
            return EventsResponse::Error {
                error: format!("API request failed! Status: {status}, Response: {body}"),
            };
        }

        let data: serde_json::Value = match response.json().await {
            Ok(data) => data,
            Err(error) => {
                return EventsResponse::Error {
                    error: format!("events response was not valid JSON: {error}"),
                }
            }
        };

        let events: Vec<Event> = data["_embedded"]["events"]
            .as_array()
            .map(|events| {
                events
                    .iter()
                    .filter_map(|event| {
                        Some(Event {
                            name: event["name"].as_str()?.to_string(),
                            date: event["dates"]["start"]["localDate"].as_str()?.to_string(),
                            venue: event["_embedded"]["venues"][0]["name"]
                                .as_str()?
                                .to_string(),
                            url: event["url"].as_str().unwrap_or("N/A").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        log::info!("found {} events for {city}", events.len());
        EventsResponse::Events(events)
    }
}
