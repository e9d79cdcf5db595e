//! Plain-text rendering of dashboard state.

use std::fmt;

use dashboard_core::{
    City, Settings, Toast, ToastKind, Units, WeatherSnapshot,
    model::{AlertSeverity, Condition},
};

const TIME_FORMAT: &str = "%I:%M %p";
const DAY_FORMAT: &str = "%a %d %b";

pub fn weather<'a>(
    city: &'a City,
    snapshot: &'a WeatherSnapshot,
    units: Units,
    hours: usize,
) -> WeatherReport<'a> {
    WeatherReport { city, snapshot, units, hours }
}

/// Current conditions, alerts, up to `hours` hourly entries and the daily outlook.
pub struct WeatherReport<'a> {
    city: &'a City,
    snapshot: &'a WeatherSnapshot,
    units: Units,
    hours: usize,
}

impl fmt::Display for WeatherReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;
        let t = self.units.temperature_suffix();
        let now = &snapshot.current;

        writeln!(f, "{}", self.city.label())?;
        writeln!(f, "  Local time: {}", local(snapshot, now.dt, TIME_FORMAT))?;
        writeln!(
            f,
            "  {:.1}{t} (feels like {:.1}{t}), {}",
            now.temp,
            now.feels_like,
            describe(&now.weather)
        )?;
        writeln!(
            f,
            "  Humidity {}%  Wind {:.1} {}",
            now.humidity,
            now.wind_speed,
            self.units.speed_suffix()
        )?;
        if let Some(visibility) = now.visibility {
            writeln!(f, "  Visibility {:.1} km", f64::from(visibility) / 1000.0)?;
        }
        if let (Some(rise), Some(set)) = (now.sunrise, now.sunset) {
            writeln!(
                f,
                "  Sunrise {}  Sunset {}",
                local(snapshot, rise, TIME_FORMAT),
                local(snapshot, set, TIME_FORMAT)
            )?;
        }

        for alert in snapshot.active_alerts() {
            let label = match alert.severity() {
                AlertSeverity::Danger => "DANGER",
                AlertSeverity::Warning => "WARNING",
                AlertSeverity::Info => "NOTICE",
            };
            writeln!(
                f,
                "\n  [{label}] {} ({} - {})",
                alert.event,
                local(snapshot, alert.start, TIME_FORMAT),
                local(snapshot, alert.end, TIME_FORMAT)
            )?;
            if let Some(sender) = &alert.sender_name {
                writeln!(f, "    from {sender}")?;
            }
        }

        let hourly = snapshot.hourly_window();
        if !hourly.is_empty() && self.hours > 0 {
            writeln!(f, "\n  Hourly")?;
            for hour in hourly.iter().take(self.hours) {
                writeln!(
                    f,
                    "    {}  {:>6.1}{t}  {:>4}  {}",
                    local(snapshot, hour.dt, TIME_FORMAT),
                    hour.temp,
                    precipitation(hour.pop),
                    describe(&hour.weather)
                )?;
            }
        }

        let daily = snapshot.daily_window();
        if !daily.is_empty() {
            writeln!(f, "\n  Next {} days", daily.len())?;
            for day in daily {
                writeln!(
                    f,
                    "    {}  {:>6.1}{t} / {:>6.1}{t}  {:>4}  {}",
                    local(snapshot, day.dt, DAY_FORMAT),
                    day.temp.min,
                    day.temp.max,
                    precipitation(day.pop),
                    describe(&day.weather)
                )?;
            }
        }

        Ok(())
    }
}

pub fn settings<'a>(settings: &'a Settings, recent: &'a [City]) -> SettingsReport<'a> {
    SettingsReport { settings, recent }
}

pub struct SettingsReport<'a> {
    settings: &'a Settings,
    recent: &'a [City],
}

impl fmt::Display for SettingsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Units:  {}", self.settings.units)?;
        writeln!(f, "Theme:  {}", self.settings.theme)?;
        match &self.settings.selected_city {
            Some(city) => {
                writeln!(f, "City:   {} ({:.4}, {:.4})", city.label(), city.lat, city.lon)?
            }
            None => writeln!(f, "City:   none selected")?,
        }
        write!(f, "{}", recent_list(self.recent))
    }
}

pub fn recent_list(recent: &[City]) -> RecentList<'_> {
    RecentList(recent)
}

/// Recent searches numbered from 1, as `recent <n>` expects.
pub struct RecentList<'a>(&'a [City]);

impl fmt::Display for RecentList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No recent searches.");
        }

        writeln!(f, "Recent searches:")?;
        for (i, city) in self.0.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, city.label())?;
        }
        Ok(())
    }
}

pub fn toast(toast: &Toast) -> String {
    let marker = match toast.kind {
        ToastKind::Success => "ok",
        ToastKind::Error => "error",
        ToastKind::Info => "info",
    };
    format!("[{marker}] {}", toast.message)
}

fn local(snapshot: &WeatherSnapshot, ts: i64, format: &str) -> String {
    snapshot
        .local_time(ts)
        .map(|t| t.format(format).to_string())
        .unwrap_or_else(|| "--".to_string())
}

fn describe(conditions: &[Condition]) -> String {
    conditions
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_default()
}

fn precipitation(pop: Option<f64>) -> String {
    match pop {
        Some(p) if p > 0.0 => format!("{:.0}%", p * 100.0),
        _ => String::new(),
    }
}
