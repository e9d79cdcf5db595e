//! Weather fetching with a request cache.
//!
//! Snapshots are cached per `(lat, lon, units)`. A cached snapshot is served
//! without touching the network until it is older than
//! [`FetchPolicy::stale_after`]. Concurrent requests for the same key share a
//! single upstream call. Failed requests are retried per
//! [`FetchPolicy::retry`] and never cached.

use crate::{
    error::ApiError,
    model::{City, Units, WeatherSnapshot},
    provider::WeatherApi,
    retry::{RetryConfig, with_retry},
};
use moka::future::Cache;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

/// Floor for [`FetchPolicy::refresh_interval`]; a zero period would spin.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub stale_after: Duration,
    /// How often a live subscription refetches.
    pub refresh_interval: Duration,
    pub retry: RetryConfig,
    pub max_entries: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(5 * 60),
            refresh_interval: Duration::from_secs(5 * 60),
            retry: RetryConfig::default(),
            max_entries: 64,
        }
    }
}

/// Cache key for one location in one unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeatherKey {
    lat_bits: u64,
    lon_bits: u64,
    pub units: Units,
}

impl WeatherKey {
    pub fn new(lat: f64, lon: f64, units: Units) -> Self {
        // `+ 0.0` folds -0.0 into 0.0 so both hash alike.
        Self { lat_bits: (lat + 0.0).to_bits(), lon_bits: (lon + 0.0).to_bits(), units }
    }

    pub fn for_city(city: &City, units: Units) -> Self {
        Self::new(city.lat, city.lon, units)
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }

    pub fn lon(&self) -> f64 {
        f64::from_bits(self.lon_bits)
    }
}

/// What a view rendering weather data has to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// Nothing to fetch (no city selected).
    Idle,
    Loading,
    Failed(String),
    Ready(T),
    /// A refresh failed; the last good data is kept next to the error.
    Stale(T, String),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) | QueryState::Stale(data, _) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed(message) | QueryState::Stale(_, message) => Some(message),
            _ => None,
        }
    }
}

pub type WeatherState = QueryState<Arc<WeatherSnapshot>>;

#[derive(Debug)]
pub struct WeatherFetcher {
    api: Arc<dyn WeatherApi>,
    cache: Cache<WeatherKey, Arc<WeatherSnapshot>>,
    policy: FetchPolicy,
}

impl WeatherFetcher {
    pub fn new(api: Arc<dyn WeatherApi>, policy: FetchPolicy) -> Self {
        let cache = Cache::builder()
            .max_capacity(policy.max_entries)
            .time_to_live(policy.stale_after)
            .build();

        Self { api, cache, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Snapshot for `city` in `units`; `Ok(None)` without a network call when
    /// no city is selected.
    pub async fn fetch(
        &self,
        city: Option<&City>,
        units: Units,
    ) -> Result<Option<Arc<WeatherSnapshot>>, ApiError> {
        let Some(city) = city else {
            return Ok(None);
        };
        let key = WeatherKey::for_city(city, units);

        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Weather cache hit for {} ({})", city.label(), units);
            return Ok(Some(hit));
        }

        let api = self.api.clone();
        let retry = self.policy.retry.clone();
        let (lat, lon) = (city.lat, city.lon);
        tracing::debug!("Fetching weather for {} ({})", city.label(), units);

        self.cache
            .try_get_with(key, async move {
                with_retry(&retry, || api.fetch_weather(lat, lon, units)).await.map(Arc::new)
            })
            .await
            .map(Some)
            .map_err(|e| (*e).clone())
    }

    /// Drops any cached snapshot for the key and fetches again.
    pub async fn refresh(
        &self,
        city: Option<&City>,
        units: Units,
    ) -> Result<Option<Arc<WeatherSnapshot>>, ApiError> {
        if let Some(city) = city {
            self.cache.invalidate(&WeatherKey::for_city(city, units)).await;
        }
        self.fetch(city, units).await
    }

    /// Like [`fetch`](Self::fetch), folded into a renderable state.
    pub async fn load(&self, city: Option<&City>, units: Units) -> WeatherState {
        into_state(self.fetch(city, units).await, None)
    }

    /// Loads now, then refreshes every [`FetchPolicy::refresh_interval`]
    /// until the returned subscription is dropped.
    pub fn subscribe(self: &Arc<Self>, city: Option<City>, units: Units) -> WeatherSubscription {
        let initial = if city.is_some() { QueryState::Loading } else { QueryState::Idle };
        let (tx, rx) = watch::channel(initial);
        let fetcher = Arc::clone(self);

        let task = tokio::spawn(async move {
            let Some(city) = city else {
                return;
            };

            tx.send_replace(fetcher.load(Some(&city), units).await);

            let period = fetcher.policy.refresh_interval.max(MIN_REFRESH_INTERVAL);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                tracing::debug!("Refreshing weather for {}", city.label());
                let result = fetcher.refresh(Some(&city), units).await;
                let last = tx.borrow().data().cloned();
                tx.send_replace(into_state(result, last));
            }
        });

        WeatherSubscription { rx, task }
    }
}

fn into_state(
    result: Result<Option<Arc<WeatherSnapshot>>, ApiError>,
    last: Option<Arc<WeatherSnapshot>>,
) -> WeatherState {
    match result {
        Ok(Some(snapshot)) => QueryState::Ready(snapshot),
        Ok(None) => QueryState::Idle,
        Err(e) => {
            tracing::warn!("Weather request failed: {}", e);
            let message = format!("Failed to fetch weather data: {}", e.user_message());
            match last {
                Some(snapshot) => QueryState::Stale(snapshot, message),
                None => QueryState::Failed(message),
            }
        }
    }
}

/// A mounted weather view. Dropping it stops the periodic refresh.
#[derive(Debug)]
pub struct WeatherSubscription {
    rx: watch::Receiver<WeatherState>,
    task: JoinHandle<()>,
}

impl WeatherSubscription {
    pub fn state(&self) -> WeatherState {
        self.rx.borrow().clone()
    }

    /// Waits for the next published state. `None` once nothing more will
    /// be published.
    pub async fn changed(&mut self) -> Option<WeatherState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the initial load has finished.
    pub async fn settled(&mut self) -> WeatherState {
        let settled =
            self.rx.wait_for(|state| !state.is_loading()).await.map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }
}

impl Drop for WeatherSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
