//! Weather lookup for SkyCast
//!
//! Forecasts come from the OpenWeather `/forecast` endpoint; positions from
//! a fixed or IP-based location provider. Searched cities are kept in a
//! small key-value store.

pub mod api;
pub mod client;
pub mod debounce;
pub mod location;
pub mod recent;
pub mod reducer;
pub mod storage;
pub mod types;

pub use api::ForecastResponse;
pub use client::{WeatherClient, MIN_QUERY_CHARS};
pub use debounce::{SearchDebouncer, DEFAULT_DEBOUNCE};
pub use location::{LocationProvider, LocationRequest};
pub use recent::{RecentLocationsStore, RECENT_LOCATIONS_KEY};
pub use reducer::{ForecastReducer, SelectionPolicy, DAYS_SHOWN};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
