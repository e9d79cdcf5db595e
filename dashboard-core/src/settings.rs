//! The settings store: single source of truth for units, theme, the
//! selected city and the active toast.
//!
//! The store is an explicit object rather than global state, so every test
//! can build a fresh one over its own [`KeyValueStore`]. Units, theme and
//! the selected city survive restarts; the toast never does.

use crate::{
    model::{City, Theme, Units},
    storage::{self, KeyValueStore},
    toast::{Toast, ToastKind},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::watch;

pub const SETTINGS_KEY: &str = "weather-dashboard-settings";

/// City shown before the user has picked one.
pub fn fallback_city() -> City {
    City::new("Istanbul", "TR", 41.0082, 28.9784).with_state("Istanbul")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub units: Units,
    pub theme: Theme,
    pub selected_city: Option<City>,
    pub toast: Option<Toast>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            units: Units::default(),
            theme: Theme::default(),
            selected_city: Some(fallback_city()),
            toast: None,
        }
    }
}

impl Settings {
    /// The durable projection of this state.
    pub fn persisted(&self) -> PersistedSettings {
        PersistedSettings {
            units: self.units,
            theme: self.theme,
            selected_city: self.selected_city.clone(),
        }
    }

    /// Rebuilds state from its durable projection; `None` yields defaults.
    pub fn from_persisted(persisted: Option<PersistedSettings>) -> Self {
        match persisted {
            Some(p) => Self {
                units: p.units,
                theme: p.theme,
                selected_city: p.selected_city,
                toast: None,
            },
            None => Self::default(),
        }
    }
}

/// What goes into storage under [`SETTINGS_KEY`].
///
/// Missing fields take their defaults; an explicit `"selectedCity": null`
/// is kept as "no city selected".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_selected_city")]
    pub selected_city: Option<City>,
}

fn default_selected_city() -> Option<City> {
    Some(fallback_city())
}

#[derive(Debug)]
pub struct SettingsStore {
    state: Mutex<Settings>,
    storage: Arc<dyn KeyValueStore>,
    notify_changes: bool,
    next_toast_id: AtomicU64,
    changes: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Restores the durable fields from `storage`.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let persisted = storage::load_json::<PersistedSettings>(storage.as_ref(), SETTINGS_KEY);
        let state = Settings::from_persisted(persisted);
        let (changes, _) = watch::channel(state.clone());

        Self {
            state: Mutex::new(state),
            storage,
            notify_changes: true,
            next_toast_id: AtomicU64::new(1),
            changes,
        }
    }

    /// Whether unit, theme and city changes announce themselves with a toast.
    pub fn with_change_notifications(mut self, enabled: bool) -> Self {
        self.notify_changes = enabled;
        self
    }

    /// Current state; an expired toast reads as `None`.
    pub fn snapshot(&self) -> Settings {
        let mut state = self.state.lock().clone();
        if state.toast.as_ref().is_some_and(Toast::is_expired) {
            state.toast = None;
        }
        state
    }

    pub fn units(&self) -> Units {
        self.state.lock().units
    }

    pub fn theme(&self) -> Theme {
        self.state.lock().theme
    }

    pub fn selected_city(&self) -> Option<City> {
        self.state.lock().selected_city.clone()
    }

    pub fn current_toast(&self) -> Option<Toast> {
        self.snapshot().toast
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.changes.subscribe()
    }

    pub fn toggle_units(&self) {
        self.transition(|state| {
            let next = state.units.toggled();
            apply_units(state, next)
        });
    }

    pub fn set_units(&self, units: Units) {
        self.transition(|state| apply_units(state, units));
    }

    pub fn toggle_theme(&self) {
        self.transition(|state| {
            let next = state.theme.toggled();
            apply_theme(state, next)
        });
    }

    pub fn set_theme(&self, theme: Theme) {
        self.transition(|state| apply_theme(state, theme));
    }

    pub fn select_city(&self, city: Option<City>) {
        self.transition(|state| {
            if state.selected_city == city {
                return None;
            }
            let message = match &city {
                Some(c) => format!("Showing weather for {}", c.label()),
                None => "City selection cleared".to_string(),
            };
            state.selected_city = city;
            Some(message)
        });
    }

    /// Replaces any live toast and returns the new toast's id.
    pub fn show_toast(&self, message: impl Into<String>, kind: ToastKind) -> u64 {
        self.show_toast_for(message, kind, None)
    }

    pub fn show_toast_for(
        &self,
        message: impl Into<String>,
        kind: ToastKind,
        duration: Option<Duration>,
    ) -> u64 {
        let toast = self.make_toast(message.into(), kind, duration);
        let id = toast.id;
        let mut state = self.state.lock();
        state.toast = Some(toast);
        self.changes.send_replace(state.clone());
        id
    }

    /// Dismisses the toast with `id`. A newer toast is left alone.
    pub fn hide_toast(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        if state.toast.as_ref().is_some_and(|t| t.id == id) {
            state.toast = None;
            self.changes.send_replace(state.clone());
            true
        } else {
            false
        }
    }

    fn make_toast(&self, message: String, kind: ToastKind, duration: Option<Duration>) -> Toast {
        let id = self.next_toast_id.fetch_add(1, Ordering::Relaxed);
        Toast::new(id, message, kind, duration)
    }

    /// Applies one state change under the lock, persists the durable fields
    /// and publishes the result. `change` returns the notification text, or
    /// `None` when nothing changed.
    fn transition(&self, change: impl FnOnce(&mut Settings) -> Option<String>) {
        let mut state = self.state.lock();
        let Some(message) = change(&mut state) else {
            return;
        };

        if let Err(e) = storage::save_json(self.storage.as_ref(), SETTINGS_KEY, &state.persisted())
        {
            tracing::warn!("Failed to persist settings: {}", e);
        }

        tracing::debug!("{}", message);
        if self.notify_changes {
            state.toast = Some(self.make_toast(message, ToastKind::Info, None));
        }
        self.changes.send_replace(state.clone());
    }
}

fn apply_units(state: &mut Settings, units: Units) -> Option<String> {
    if state.units == units {
        return None;
    }
    state.units = units;
    Some(format!("Units changed to {} ({})", units, units.temperature_suffix()))
}

fn apply_theme(state: &mut Settings, theme: Theme) -> Option<String> {
    if state.theme == theme {
        return None;
    }
    state.theme = theme;
    Some(format!("Theme changed to {theme}"))
}
