//! City search: debounced geocoding lookups and the recent-search list.
//!
//! Every keystroke goes through [`SearchController::input`]. The lookup runs
//! once the input has been quiet for the debounce period, always with the
//! latest text. Lookups already in flight are not cancelled; a response is
//! applied only while no keystroke, selection or dismissal has happened
//! since it was issued.

use crate::{
    error::ApiError,
    model::City,
    provider::{CITY_SEARCH_LIMIT, WeatherApi},
    recent::RecentSearches,
    settings::SettingsStore,
    storage::KeyValueStore,
    toast::ToastKind,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// What the suggestion panel shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestions {
    /// Empty input: the recent-search list.
    Recent(Vec<City>),
    /// Waiting for the debounce timer or the lookup.
    Searching,
    Results(Vec<City>),
    /// The lookup for this query matched nothing.
    NoResults(String),
    Failed(String),
}

impl Suggestions {
    pub fn is_searching(&self) -> bool {
        matches!(self, Suggestions::Searching)
    }

    /// Cities the user can pick from right now.
    pub fn cities(&self) -> &[City] {
        match self {
            Suggestions::Recent(cities) | Suggestions::Results(cities) => cities,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub input: String,
    /// The last input value the debounce timer let through.
    pub debounced: String,
    pub panel_open: bool,
    pub suggestions: Suggestions,
}

#[derive(Debug)]
struct SearchState {
    view: SearchView,
    recent: RecentSearches,
    /// Bumped by every input change; a lookup only lands in its own generation.
    generation: u64,
}

impl SearchState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn show_recent(&mut self) {
        self.view.suggestions = Suggestions::Recent(self.recent.as_slice().to_vec());
    }
}

#[derive(Debug)]
struct Shared {
    api: Arc<dyn WeatherApi>,
    settings: Arc<SettingsStore>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<SearchState>,
    changes: watch::Sender<SearchView>,
}

impl Shared {
    fn publish(&self, state: &SearchState) {
        self.changes.send_replace(state.view.clone());
    }

    async fn run_query(self: Arc<Self>, text: String, generation: u64) {
        let query = text.trim().to_string();
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.view.debounced = text.clone();
            if query.is_empty() {
                state.show_recent();
                self.publish(&state);
                return;
            }
        }

        tracing::debug!("Looking up cities matching '{}'", query);
        let result = self.api.search_cities(&query, CITY_SEARCH_LIMIT).await;

        let toast = {
            let mut state = self.state.lock();
            if state.generation != generation {
                tracing::debug!("Discarding stale lookup for '{}'", query);
                return;
            }

            let (suggestions, toast) = outcome(&query, result);
            state.view.suggestions = suggestions;
            self.publish(&state);
            toast
        };

        if let Some(message) = toast {
            self.settings.show_toast(message, ToastKind::Error);
        }
    }
}

/// Folds a lookup result into suggestions, plus the error toast to raise.
fn outcome(query: &str, result: Result<Vec<City>, ApiError>) -> (Suggestions, Option<String>) {
    match result {
        Ok(cities) if cities.is_empty() => (Suggestions::NoResults(query.to_string()), None),
        Ok(cities) => (Suggestions::Results(cities), None),
        Err(e) if e.is_not_found() => (Suggestions::NoResults(query.to_string()), None),
        Err(e) => {
            tracing::warn!("City lookup for '{}' failed: {}", query, e);
            let message = e.user_message().to_string();
            (Suggestions::Failed(message.clone()), Some(message))
        }
    }
}

#[derive(Debug)]
pub struct SearchController {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchController {
    /// Restores the recent-search list from `storage` and mirrors the
    /// selected city's name into the input.
    pub fn new(
        api: Arc<dyn WeatherApi>,
        settings: Arc<SettingsStore>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let recent = RecentSearches::load(storage.as_ref());
        let name = settings.selected_city().map(|c| c.name).unwrap_or_default();
        let view = SearchView {
            input: name.clone(),
            debounced: name,
            panel_open: false,
            suggestions: Suggestions::Recent(recent.as_slice().to_vec()),
        };
        let (changes, _) = watch::channel(view.clone());

        Self {
            shared: Arc::new(Shared {
                api,
                settings,
                storage,
                state: Mutex::new(SearchState { view, recent, generation: 0 }),
                changes,
            }),
            debounce: SEARCH_DEBOUNCE,
            pending: Mutex::new(None),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn view(&self) -> SearchView {
        self.shared.state.lock().view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.shared.changes.subscribe()
    }

    pub fn recent_searches(&self) -> Vec<City> {
        self.shared.state.lock().recent.as_slice().to_vec()
    }

    /// Records a keystroke and restarts the debounce timer.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        let generation = {
            let mut state = self.shared.state.lock();
            let generation = state.next_generation();
            state.view.input = text.clone();
            state.view.panel_open = true;
            if text.trim().is_empty() {
                state.show_recent();
            } else {
                state.view.suggestions = Suggestions::Searching;
            }
            self.shared.publish(&state);
            generation
        };

        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Detached so a later keystroke cannot abort a lookup in flight.
            tokio::spawn(shared.run_query(text, generation));
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Makes `city` the selected city and records it as a recent search.
    pub fn select(&self, city: City) {
        self.cancel_pending();
        self.shared.settings.select_city(Some(city.clone()));

        let mut state = self.shared.state.lock();
        state.next_generation();
        state.recent.record(city.clone());
        if let Err(e) = state.recent.save(self.shared.storage.as_ref()) {
            tracing::warn!("Failed to save recent searches: {}", e);
        }

        state.view.input = city.name.clone();
        state.view.debounced = city.name.clone();
        state.view.panel_open = false;
        state.show_recent();
        self.shared.publish(&state);
        tracing::info!("Selected {}", city.label());
    }

    /// Selects the recent search at `index`, if there is one.
    pub fn select_recent(&self, index: usize) -> Option<City> {
        let city = self.shared.state.lock().recent.get(index).cloned()?;
        self.select(city.clone());
        Some(city)
    }

    pub fn focus(&self) {
        let has_selection = self.shared.settings.selected_city().is_some();
        if has_selection {
            self.cancel_pending();
        }

        let mut state = self.shared.state.lock();
        state.view.panel_open = true;
        if has_selection {
            state.next_generation();
            state.view.input.clear();
            state.view.debounced.clear();
            state.show_recent();
        }
        self.shared.publish(&state);
    }

    /// Closes the panel, putting the selected city's name back if the user
    /// typed over it.
    pub fn click_outside(&self) {
        let selected = self.shared.settings.selected_city();
        if selected.is_some() {
            self.cancel_pending();
        }

        let mut state = self.shared.state.lock();
        state.view.panel_open = false;
        if let Some(city) = selected {
            state.next_generation();
            state.view.input = city.name.clone();
            state.view.debounced = city.name;
            state.show_recent();
        }
        self.shared.publish(&state);
    }

    /// Waits until no lookup is pending for the current input.
    pub async fn settle(&self) -> SearchView {
        let mut rx = self.subscribe();
        match rx.wait_for(|view| !view.suggestions.is_searching()).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    fn cancel_pending(&self) {
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
