//! Test doubles shared by the unit tests in this crate.

use crate::{
    error::ApiError,
    model::{City, Units, WeatherSnapshot},
    provider::WeatherApi,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

pub fn berlin() -> City {
    City::new("Berlin", "DE", 52.52, 13.405)
}

pub fn sample_snapshot() -> WeatherSnapshot {
    serde_json::from_value(serde_json::json!({
        "timezone_offset": 3600,
        "current": {
            "dt": 1_705_320_000, "sunrise": 1_705_302_900, "sunset": 1_705_332_600,
            "temp": 5.5, "feels_like": 2.0, "humidity": 75, "wind_speed": 3.4,
            "visibility": 10_000,
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}]
        },
        "hourly": [
            {"dt": 1_705_320_000, "temp": 5.5, "pop": 0.1,
             "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}]}
        ],
        "daily": [
            {"dt": 1_705_316_400, "temp": {"min": 2.0, "max": 8.0, "day": 6.0}, "pop": 0.2,
             "weather": [{"id": 500, "main": "Rain", "description": "light rain"}]}
        ]
    }))
    .expect("sample snapshot must deserialize")
}

/// Scripted [`WeatherApi`] that records every call.
#[derive(Debug, Default)]
pub struct FakeApi {
    city_queries: Mutex<Vec<String>>,
    city_results: Mutex<HashMap<String, Result<Vec<City>, ApiError>>>,
    query_delays: Mutex<HashMap<String, Duration>>,
    weather_calls: AtomicUsize,
    weather_failures: AtomicUsize,
    weather_delay: Mutex<Option<Duration>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cities(self, query: &str, result: Result<Vec<City>, ApiError>) -> Self {
        self.city_results.lock().insert(query.to_string(), result);
        self
    }

    pub fn with_query_delay(self, query: &str, delay: Duration) -> Self {
        self.query_delays.lock().insert(query.to_string(), delay);
        self
    }

    /// The next `count` weather requests answer 500.
    pub fn failing_weather(self, count: usize) -> Self {
        self.weather_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Like [`failing_weather`](Self::failing_weather), once the fake is shared.
    pub fn fail_next_weather(&self, count: usize) {
        self.weather_failures.store(count, Ordering::SeqCst);
    }

    pub fn with_weather_delay(self, delay: Duration) -> Self {
        *self.weather_delay.lock() = Some(delay);
        self
    }

    pub fn city_queries(&self) -> Vec<String> {
        self.city_queries.lock().clone()
    }

    pub fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherApi for FakeApi {
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<City>, ApiError> {
        self.city_queries.lock().push(query.to_string());

        let delay = self.query_delays.lock().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.city_results.lock().get(query).cloned().unwrap_or(Ok(Vec::new()));
        result.map(|mut cities| {
            cities.truncate(limit);
            cities
        })
    }

    async fn fetch_weather(
        &self,
        _lat: f64,
        _lon: f64,
        _units: Units,
    ) -> Result<WeatherSnapshot, ApiError> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.weather_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .weather_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::Status { status: 500, body: "upstream down".into() });
        }

        Ok(sample_snapshot())
    }
}
