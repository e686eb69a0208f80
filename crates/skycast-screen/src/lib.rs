//! Screen controller for SkyCast.
//!
//! Owns the weather screen's state and wires user events to location,
//! forecast, debounce and recent-search services.

pub mod models;
pub mod sequence;
pub mod services;

pub use models::{ForecastScreen, ScreenState, SearchState};
pub use sequence::{RequestSequence, Ticket};
pub use services::{FetchOrigin, ScreenMessage};
