use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{fetcher::FetchPolicy, provider::BackendId, retry::RetryConfig};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Retry settings as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self { max_retries: 2, initial_delay_ms: 1_000, max_delay_ms: 30_000 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// backend = "openweather"
/// openweather_api_key = "..."
/// debounce_ms = 300
///
/// [retry]
/// max_retries = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendId,
    /// Base URL of the dashboard API serving `/cities` and `/weather`.
    pub api_base_url: String,
    pub openweather_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub debounce_ms: u64,
    pub stale_after_secs: u64,
    pub refresh_interval_secs: u64,
    /// Announce unit/theme/city changes with a toast.
    pub notify_changes: bool,
    pub retry: RetrySection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendId::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            openweather_api_key: None,
            request_timeout_secs: 5,
            debounce_ms: 300,
            stale_after_secs: 300,
            refresh_interval_secs: 300,
            notify_changes: true,
            retry: RetrySection::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Rejects values the fetcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be at least 1");
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            bail!("retry.initial_delay_ms must not exceed retry.max_delay_ms");
        }
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-dashboard", "weather-dashboard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory backing durable client storage (settings, recent searches).
    pub fn storage_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("storage"))
    }

    /// Switch to the proxy backend at `base_url`.
    pub fn use_proxy(&mut self, base_url: String) {
        self.backend = BackendId::Proxy;
        self.api_base_url = base_url;
    }

    /// Store the OpenWeather key and make OpenWeather the active backend.
    pub fn use_openweather(&mut self, api_key: String) {
        self.backend = BackendId::OpenWeather;
        self.openweather_api_key = Some(api_key);
    }

    pub fn is_backend_configured(&self, backend: BackendId) -> bool {
        match backend {
            BackendId::Proxy => !self.api_base_url.trim().is_empty(),
            BackendId::OpenWeather => {
                self.openweather_api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            }
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry.max_retries,
            self.retry.initial_delay_ms,
            self.retry.max_delay_ms,
        )
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            stale_after: Duration::from_secs(self.stale_after_secs),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            retry: self.retry_config(),
            ..FetchPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_policy() {
        let cfg = Config::default();

        assert_eq!(cfg.backend, BackendId::Proxy);
        assert_eq!(cfg.search_debounce(), Duration::from_millis(300));
        assert_eq!(cfg.retry_config(), RetryConfig::default());

        let policy = cfg.fetch_policy();
        assert_eq!(policy.stale_after, Duration::from_secs(300));
        assert_eq!(policy.refresh_interval, Duration::from_secs(300));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "debounce_ms = 150\n[retry]\nmax_retries = 4\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.debounce_ms, 150);
        assert_eq!(cfg.retry.max_retries, 4);
        assert_eq!(cfg.retry.initial_delay_ms, 1_000);
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut cfg = Config::default();
        cfg.use_openweather("OPEN_KEY".into());
        cfg.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.backend, BackendId::OpenWeather);
        assert_eq!(reloaded.openweather_api_key.as_deref(), Some("OPEN_KEY"));
        assert!(reloaded.is_backend_configured(BackendId::OpenWeather));
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "refresh_interval_secs = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(format!("{err:#}").contains("refresh_interval_secs must be at least 1"));
    }

    #[test]
    fn inverted_retry_delays_are_rejected() {
        let cfg = Config {
            retry: RetrySection { initial_delay_ms: 5_000, max_delay_ms: 100, ..RetrySection::default() },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn use_proxy_switches_backend_back() {
        let mut cfg = Config::default();
        cfg.use_openweather("KEY".into());
        cfg.use_proxy("https://dash.example/api".into());

        assert_eq!(cfg.backend, BackendId::Proxy);
        assert_eq!(cfg.api_base_url, "https://dash.example/api");
        assert!(cfg.is_backend_configured(BackendId::OpenWeather));
    }
}
