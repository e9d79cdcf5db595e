use crate::{
    Config,
    error::ApiError,
    model::{City, Units, WeatherSnapshot},
    provider::{openweather::OpenWeatherApi, proxy::ProxyApi},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};

pub mod openweather;
pub mod proxy;

/// Upper bound on geocoding matches requested per lookup.
pub const CITY_SEARCH_LIMIT: usize = 5;

/// Where the dashboard gets its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// The dashboard's own `/cities` and `/weather` endpoints.
    #[default]
    Proxy,
    /// OpenWeather called directly with the user's API key.
    OpenWeather,
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Proxy => "proxy",
            BackendId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [BackendId] {
        &[BackendId::Proxy, BackendId::OpenWeather]
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BackendId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "proxy" => Ok(BackendId::Proxy),
            "openweather" => Ok(BackendId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown backend '{value}'. Supported backends: proxy, openweather."
            )),
        }
    }
}

/// Geocoding and weather lookups, whatever serves them.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    /// Up to `limit` places matching `query`. "Nothing found" is `Ok(vec![])`,
    /// including when the upstream answers 404.
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<City>, ApiError>;

    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<WeatherSnapshot, ApiError>;
}

/// Construct the API client selected in `config`.
pub fn api_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherApi>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let api: Arc<dyn WeatherApi> = match config.backend {
        BackendId::Proxy => Arc::new(ProxyApi::new(&config.api_base_url, timeout)?),
        BackendId::OpenWeather => {
            let api_key = config.openweather_api_key.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for backend 'openweather'.\n\
                     Hint: run `weather-dashboard configure openweather` and enter your API key."
                )
            })?;
            Arc::new(OpenWeatherApi::new(api_key.to_owned(), timeout)?)
        }
    };

    Ok(api)
}

pub(crate) fn validate_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Query parameter is required"));
    }
    Ok(trimmed)
}

pub(crate) fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ApiError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(ApiError::Validation("Latitude and longitude are required"));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::Validation("Invalid coordinates"));
    }
    Ok(())
}

/// Reads a response body as JSON, turning non-2xx statuses into errors.
pub(crate) async fn read_json(res: reqwest::Response) -> Result<serde_json::Value, ApiError> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        tracing::debug!("Request failed with status {}: {}", status, truncate_body(&body));
        return Err(ApiError::Status { status: status.as_u16(), body: truncate_body(&body) });
    }

    Ok(serde_json::from_str(&body)?)
}

pub(crate) fn decode_cities(
    response: Result<serde_json::Value, ApiError>,
    limit: usize,
) -> Result<Vec<City>, ApiError> {
    let value = match response {
        Ok(value) => value,
        Err(e) if e.is_not_found() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    if value.is_null() {
        return Ok(Vec::new());
    }

    let mut cities: Vec<City> = serde_json::from_value(value)?;
    cities.truncate(limit);
    Ok(cities)
}

/// An empty object or `null` is a failure even on HTTP 200.
pub(crate) fn decode_snapshot(value: serde_json::Value) -> Result<WeatherSnapshot, ApiError> {
    let empty = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ApiError::EmptyBody);
    }

    Ok(serde_json::from_value(value)?)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
