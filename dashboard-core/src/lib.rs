//! Core library for the `weather-dashboard` CLI.
//!
//! This crate defines:
//! - Configuration and durable client storage
//! - The settings store (units, theme, selected city, toasts)
//! - Debounced city search with a recent-search list
//! - Cached, retrying weather fetches over a pluggable API backend
//!
//! It is used by `dashboard-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod provider;
pub mod recent;
pub mod retry;
pub mod search;
pub mod settings;
pub mod storage;
pub mod toast;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{ApiError, StorageError};
pub use fetcher::{FetchPolicy, QueryState, WeatherFetcher, WeatherState, WeatherSubscription};
pub use model::{City, Theme, Units, WeatherSnapshot};
pub use provider::{BackendId, WeatherApi, api_from_config};
pub use recent::RecentSearches;
pub use search::{SearchController, SearchView, Suggestions};
pub use settings::{Settings, SettingsStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use toast::{Toast, ToastKind};
