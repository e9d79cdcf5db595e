use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::{
    error::ApiError,
    model::{City, Units, WeatherSnapshot},
};

use super::{WeatherApi, decode_cities, decode_snapshot, read_json, validate_coordinates, validate_query};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Talks to OpenWeather directly: the geocoding API for city lookups and
/// One Call 3.0 for forecasts.
#[derive(Debug, Clone)]
pub struct OpenWeatherApi {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherApi {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::Validation("API key is not configured"));
        }
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http })
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherApi {
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<City>, ApiError> {
        let query = validate_query(query)?;
        let url = format!("{}/geo/1.0/direct", self.base_url);
        tracing::debug!("OpenWeather geocoding q={} limit={}", query, limit);

        let limit_param = limit.to_string();
        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", limit_param.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        decode_cities(read_json(res).await, limit)
    }

    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<WeatherSnapshot, ApiError> {
        validate_coordinates(lat, lon)?;
        let url = format!("{}/data/3.0/onecall", self.base_url);
        tracing::debug!("OpenWeather one-call lat={} lon={} units={}", lat, lon, units);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", units.as_str().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        let value = read_json(res).await.inspect_err(|e| {
            if let Some(status) = e.status() {
                tracing::warn!("OpenWeather one-call returned status {}", status);
            }
        })?;

        decode_snapshot(value)
    }
}
