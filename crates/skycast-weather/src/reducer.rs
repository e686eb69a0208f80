//! Turns the raw 3-hour forecast list into the at-most-five-day display list.
//!
//! The reducer is pure: the same raw list, reference date and offset always
//! give the same output.

use std::collections::BTreeSet;

use chrono::{FixedOffset, NaiveDate};
use skycast_core::Units;

use crate::api::{ForecastResponse, RawEntry};
use crate::types::{calendar_day, utc_offset, ForecastEntry, ForecastList};

/// Maximum number of days shown.
pub const DAYS_SHOWN: usize = 5;

/// Raw slots per day for 3-hour data.
pub const SLOTS_PER_DAY: usize = 8;

/// How entries are picked from the raw list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Every n-th entry starting at index 0, input order preserved.
    Stride(usize),
    /// First entry of each calendar day after the reference day. Days up to
    /// and including the reference day are dropped.
    DailyFirst,
}

impl SelectionPolicy {
    /// Policy for the coordinate ("home") forecast.
    pub const fn home() -> Self {
        SelectionPolicy::Stride(SLOTS_PER_DAY)
    }

    /// Policy for the search-by-name forecast.
    pub const fn search() -> Self {
        SelectionPolicy::DailyFirst
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForecastReducer {
    policy: SelectionPolicy,
    max_entries: usize,
    offset: FixedOffset,
}

impl ForecastReducer {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            max_entries: DAYS_SHOWN,
            offset: utc_offset(),
        }
    }

    /// Offset used to derive calendar days.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Select display entries from `raw`.
    ///
    /// `reference_date` is "today" at the reducer's offset; only the
    /// `DailyFirst` policy uses it.
    pub fn reduce(&self, raw: &[RawEntry], reference_date: NaiveDate) -> Vec<ForecastEntry> {
        match self.policy {
            SelectionPolicy::Stride(stride) => raw
                .iter()
                .step_by(stride.max(1))
                .take(self.max_entries)
                .map(ForecastEntry::from)
                .collect(),
            SelectionPolicy::DailyFirst => self.first_per_day(raw, reference_date),
        }
    }

    fn first_per_day(&self, raw: &[RawEntry], reference_date: NaiveDate) -> Vec<ForecastEntry> {
        let mut ordered: Vec<&RawEntry> = raw.iter().collect();
        ordered.sort_by_key(|entry| entry.dt);

        let mut seen = BTreeSet::new();
        let mut selected = Vec::with_capacity(self.max_entries);

        for entry in ordered {
            if selected.len() >= self.max_entries {
                break;
            }
            let Some(day) = calendar_day(entry.dt, self.offset) else {
                tracing::debug!("Skipping entry with out-of-range timestamp {}", entry.dt);
                continue;
            };
            if day <= reference_date || !seen.insert(day) {
                continue;
            }
            selected.push(ForecastEntry::from(entry));
        }

        selected
    }

    /// Build the display list for a successful response.
    ///
    /// Calendar days are taken at the city's own offset when the response
    /// carries one; `today` is the current UTC date shifted to that offset.
    pub fn reduce_response(
        &self,
        response: &ForecastResponse,
        units: Units,
        now_utc: chrono::DateTime<chrono::Utc>,
    ) -> ForecastList {
        let offset = FixedOffset::east_opt(response.utc_offset_secs()).unwrap_or(self.offset);
        let reducer = self.with_offset(offset);
        let reference_date = now_utc.with_timezone(&offset).date_naive();

        ForecastList {
            city_name: response.city_name().to_string(),
            country: response.city.as_ref().and_then(|c| c.country.clone()),
            units,
            utc_offset_secs: offset.local_minus_utc(),
            current: response.list.iter().min_by_key(|e| e.dt).map(ForecastEntry::from),
            entries: reducer.reduce(&response.list, reference_date),
        }
    }
}
