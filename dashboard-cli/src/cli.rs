use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dashboard_core::{
    BackendId, City, Config, FileStore, KeyValueStore, QueryState, RecentSearches,
    SearchController, SettingsStore, Suggestions, Theme, Units, WeatherFetcher, WeatherState,
    api_from_config,
};
use inquire::{Password, Select, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    /// Print debug logs to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Choose the data backend and enter its settings.
    Configure {
        /// Backend short name: "proxy" or "openweather".
        backend: Option<String>,
    },

    /// Look up a city by name and make it the selected city.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Take the first match instead of asking.
        #[arg(long)]
        first: bool,
    },

    /// List recent searches, or select one by its number.
    Recent { index: Option<usize> },

    /// Show weather for the selected city.
    Show {
        /// Hourly entries to print.
        #[arg(long, default_value_t = 12)]
        hours: usize,

        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// Keep showing weather for the selected city, refreshing periodically.
    Watch {
        #[arg(long, default_value_t = 6)]
        hours: usize,
    },

    /// Print or change the unit system: metric, imperial or toggle.
    Units { value: Option<String> },

    /// Print or change the theme: light, dark or toggle.
    Theme { value: Option<String> },

    /// Print the current settings and recent searches.
    Settings,
}

/// Everything a command needs, wired from the config file.
struct Dashboard {
    config: Config,
    storage: Arc<dyn KeyValueStore>,
    settings: Arc<SettingsStore>,
}

impl Dashboard {
    fn open() -> anyhow::Result<Self> {
        let config = Config::load()?;
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(Config::storage_dir()?));
        let settings = Arc::new(
            SettingsStore::load(storage.clone()).with_change_notifications(config.notify_changes),
        );
        tracing::debug!(
            backend = %config.backend,
            configured = config.is_backend_configured(config.backend),
            "Dashboard opened"
        );

        Ok(Self { config, storage, settings })
    }

    fn fetcher(&self) -> anyhow::Result<Arc<WeatherFetcher>> {
        let api = api_from_config(&self.config)?;
        Ok(Arc::new(WeatherFetcher::new(api, self.config.fetch_policy())))
    }

    fn search(&self) -> anyhow::Result<SearchController> {
        let api = api_from_config(&self.config)?;
        Ok(SearchController::new(api, self.settings.clone(), self.storage.clone())
            .with_debounce(self.config.search_debounce()))
    }

    fn print_toast(&self) {
        if let Some(toast) = self.settings.current_toast() {
            println!("{}", render::toast(&toast));
        }
    }

    async fn show(&self, hours: usize, refresh: bool) -> anyhow::Result<()> {
        let Some(city) = self.settings.selected_city() else {
            println!("No city selected. Run `weather-dashboard search <city>` first.");
            return Ok(());
        };
        let units = self.settings.units();
        let fetcher = self.fetcher()?;

        let result = if refresh {
            fetcher.refresh(Some(&city), units).await
        } else {
            fetcher.fetch(Some(&city), units).await
        };

        match result {
            Ok(Some(snapshot)) => print!("{}", render::weather(&city, &snapshot, units, hours)),
            Ok(None) => println!("No weather data available."),
            Err(e) => bail!("Failed to fetch weather data: {}", e.user_message()),
        }
        Ok(())
    }

    async fn watch(&self, hours: usize) -> anyhow::Result<()> {
        let Some(city) = self.settings.selected_city() else {
            println!("No city selected. Run `weather-dashboard search <city>` first.");
            return Ok(());
        };
        let units = self.settings.units();
        let fetcher = self.fetcher()?;
        let mut sub = fetcher.subscribe(Some(city.clone()), units);

        println!("Loading weather for {}...", city.label());
        print_state(&city, &sub.settled().await, units, hours);

        loop {
            tokio::select! {
                state = sub.changed() => match state {
                    Some(state) => print_state(&city, &state, units, hours),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }

    async fn search_and_select(&self, query: &str, first: bool) -> anyhow::Result<()> {
        let search = self.search()?;
        search.focus();
        search.input(query);

        let view = search.settle().await;
        let cities = match view.suggestions {
            Suggestions::Results(cities) => cities,
            Suggestions::NoResults(q) => {
                println!("No cities found for '{q}'.");
                return Ok(());
            }
            Suggestions::Failed(_) => {
                self.print_toast();
                return Ok(());
            }
            Suggestions::Recent(_) | Suggestions::Searching => return Ok(()),
        };

        let city = if first || cities.len() == 1 {
            cities[0].clone()
        } else {
            pick_city(&cities)?
        };

        search.select(city);
        self.print_toast();
        self.show(12, false).await
    }

    fn select_recent(&self, index: usize) -> anyhow::Result<City> {
        let search = self.search()?;
        let position = index.checked_sub(1).context("Recent searches are numbered from 1")?;
        match search.select_recent(position) {
            Some(city) => Ok(city),
            None => bail!("No recent search #{index}. Run `weather-dashboard recent` to list them."),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let dashboard = Dashboard::open()?;

        match self.command {
            Command::Configure { backend } => configure(dashboard.config, backend)?,
            Command::Search { query, first } => {
                dashboard.search_and_select(&query.join(" "), first).await?;
            }
            Command::Recent { index: None } => {
                let recent = RecentSearches::load(dashboard.storage.as_ref());
                print!("{}", render::recent_list(recent.as_slice()));
            }
            Command::Recent { index: Some(index) } => {
                dashboard.select_recent(index)?;
                dashboard.print_toast();
                dashboard.show(12, false).await?;
            }
            Command::Show { hours, refresh } => dashboard.show(hours, refresh).await?,
            Command::Watch { hours } => dashboard.watch(hours).await?,
            Command::Units { value } => {
                match value.as_deref() {
                    None => println!("{}", dashboard.settings.units()),
                    Some("toggle") => dashboard.settings.toggle_units(),
                    Some(v) => dashboard.settings.set_units(v.parse::<Units>()?),
                }
                dashboard.print_toast();
            }
            Command::Theme { value } => {
                match value.as_deref() {
                    None => println!("{}", dashboard.settings.theme()),
                    Some("toggle") => dashboard.settings.toggle_theme(),
                    Some(v) => dashboard.settings.set_theme(v.parse::<Theme>()?),
                }
                dashboard.print_toast();
            }
            Command::Settings => {
                let recent = RecentSearches::load(dashboard.storage.as_ref());
                print!("{}", render::settings(&dashboard.settings.snapshot(), recent.as_slice()));
                println!("Backend: {}", dashboard.config.backend);
                println!("Config:  {}", Config::config_file_path()?.display());
            }
        }

        Ok(())
    }
}

fn configure(mut cfg: Config, backend: Option<String>) -> anyhow::Result<()> {
    let backend = match backend {
        Some(name) => BackendId::try_from(name.as_str())?,
        None => Select::new("Data backend:", BackendId::all().to_vec())
            .with_starting_cursor(if cfg.backend == BackendId::Proxy { 0 } else { 1 })
            .prompt()?,
    };

    match backend {
        BackendId::Proxy => {
            let url = Text::new("API base URL:").with_default(&cfg.api_base_url).prompt()?;
            cfg.use_proxy(url.trim().to_string());
        }
        BackendId::OpenWeather => {
            let key = Password::new("OpenWeather API key:").without_confirmation().prompt()?;
            if key.trim().is_empty() {
                bail!("API key must not be empty");
            }
            cfg.use_openweather(key.trim().to_string());
        }
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn pick_city(cities: &[City]) -> anyhow::Result<City> {
    let labels: Vec<String> = cities.iter().map(City::label).collect();
    let choice = Select::new("Select a city:", labels).raw_prompt()?;
    Ok(cities[choice.index].clone())
}

fn print_state(city: &City, state: &WeatherState, units: Units, hours: usize) {
    match state {
        QueryState::Idle => println!("No city selected."),
        QueryState::Loading => println!("Loading..."),
        QueryState::Failed(message) => eprintln!("{message}"),
        QueryState::Ready(snapshot) => {
            println!("--- updated {} ---", chrono::Local::now().format("%H:%M:%S"));
            print!("{}", render::weather(city, snapshot, units, hours));
        }
        QueryState::Stale(snapshot, message) => {
            eprintln!("{message} (showing last data)");
            print!("{}", render::weather(city, snapshot, units, hours));
        }
    }
}
