use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

pub const WEATHERAPI_KEY_ENV: &str = "WEATHERAPI_KEY";

const WEATHER_API_URL: &str = "https://api.weatherapi.com/v1/forecast.json";
const API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    pub date: String,
    pub temp: f64,
}

/// Weather lookup result. Failures are reported in band, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WeatherResponse {
    Forecast {
        city: String,
        forecast: Vec<ForecastDay>,
    },
    Error {
        error: String,
    },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn get_weather(&self, city: &str, days: u8) -> WeatherResponse;
}

/// Fetches forecasts from WeatherAPI.com.
pub struct WeatherApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WeatherApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: WEATHER_API_URL.to_string(),
        }
    }

    /// Build a client from the `WEATHERAPI_KEY` environment variable.
    /// The key is captured once here and never read again.
    pub fn from_env() -> Result<Self, CapabilityError> {
        let api_key = std::env::var(WEATHERAPI_KEY_ENV)
            .map_err(|_| CapabilityError::MissingCredential(WEATHERAPI_KEY_ENV))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn get_weather(&self, city: &str, days: u8) -> WeatherResponse {
        log::debug!("fetching weather for {city} for {days} days");

        let result = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", city),
                ("days", &days.to_string()),
            ])
            .timeout(API_TIMEOUT)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                return WeatherResponse::Error {
                    error: format!("weather request failed: {error}"),
                }
            }
        };

        if !response.status().is_success() {
            log::warn!("failed to fetch weather for {}: {}", city, response.status());
            return WeatherResponse::Error {
                error: format!(
                    "City '{city}' not found or other issue. Please check the city name and try again."
                ),
            };
        }

        let data: serde_json::Value = match response.json().await {
            Ok(data) => data,
            Err(error) => {
                return WeatherResponse::Error {
                    error: format!("weather response was not valid JSON: {error}"),
                }
            }
        };

        let forecast: Vec<ForecastDay> = data["forecast"]["forecastday"]
            .as_array()
            .map(|days| {
                days.iter()
                    .filter_map(|day| {
                        Some(ForecastDay {
                            date: day["date"].as_str()?.to_string(),
                            temp: day["day"]["avgtemp_f"].as_f64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        log::info!("fetched weather for {city}: {} forecast days", forecast.len());
        WeatherResponse::Forecast {
            city: city.to_string(),
            forecast,
        }
    }
}
