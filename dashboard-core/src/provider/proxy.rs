use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::{
    error::ApiError,
    model::{City, Units, WeatherSnapshot},
};

use super::{WeatherApi, decode_cities, decode_snapshot, read_json, validate_coordinates, validate_query};

/// Client for the dashboard's own API (`GET /cities`, `GET /weather`).
#[derive(Debug, Clone)]
pub struct ProxyApi {
    base_url: String,
    http: Client,
}

impl ProxyApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherApi for ProxyApi {
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<City>, ApiError> {
        let query = validate_query(query)?;
        let url = format!("{}/cities", self.base_url);
        tracing::debug!("GET {} q={} limit={}", url, query, limit);

        let limit_param = limit.to_string();
        let res = self
            .http
            .get(&url)
            .query(&[("q", query), ("limit", limit_param.as_str())])
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
        let url = format!("{}/weather", self.base_url);
        tracing::debug!("GET {} lat={} lon={} units={}", url, lat, lon, units);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", units.as_str().to_string()),
            ])
            .send()
            .await?;

        decode_snapshot(read_json(res).await?)
    }
}
