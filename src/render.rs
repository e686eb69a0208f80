//! Plain-text rendering of screen state.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use skycast_core::Units;
use skycast_screen::ScreenState;
use skycast_weather::{ForecastEntry, ForecastList, RecentLocation};

fn day_label(entry: &ForecastEntry, offset: FixedOffset) -> String {
    entry
        .datetime()
        .map(|dt| dt.with_timezone(&offset).format("%a %d %b %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn entry_line(entry: &ForecastEntry, units: Units) -> String {
    let description = if entry.condition_description.is_empty() {
        entry.condition.description().to_string()
    } else {
        entry.condition_description.clone()
    };
    format!(
        "{:>6.1}{}  {:<20} humidity {:>3}%  wind {:.1} {}",
        entry.temperature,
        units.temperature_symbol(),
        description,
        entry.humidity,
        entry.wind_speed,
        units.wind_speed_unit()
    )
}

pub fn forecast(list: &ForecastList) -> String {
    let mut out = String::new();
    let offset = list.offset();

    match &list.country {
        Some(country) => {
            let _ = writeln!(out, "{}, {}", list.city_name, country);
        }
        None => {
            let _ = writeln!(out, "{}", list.city_name);
        }
    }

    if let Some(current) = &list.current {
        let _ = writeln!(out, "  Now                {}", entry_line(current, list.units));
    }

    if list.entries.is_empty() {
        let _ = writeln!(out, "  No upcoming days in this forecast.");
    }
    for entry in &list.entries {
        let _ = writeln!(
            out,
            "  {:<18} {}",
            day_label(entry, offset),
            entry_line(entry, list.units)
        );
    }
    out
}

pub fn recent(entries: &[RecentLocation]) -> String {
    if entries.is_empty() {
        return "No recent searches.\n".to_string();
    }

    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let when = DateTime::from_timestamp_millis(entry.searched_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{:>3}. {:<24} {}", i + 1, entry.city_name, when);
    }
    out
}

/// Everything worth showing after a state change.
pub fn screen(state: &ScreenState) -> String {
    let mut out = String::new();
    if let Some(alert) = &state.alert {
        let _ = writeln!(out, "! {}", alert);
    }
    match &state.forecast {
        Some(list) => out.push_str(&forecast(list)),
        None if state.loading || state.locating => out.push_str("Loading...\n"),
        None => {}
    }
    out
}
