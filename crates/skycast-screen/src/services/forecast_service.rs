//! Forecast backend: async location and forecast requests.
//! Network work runs on spawned tasks; results come back over the screen channel.

use std::sync::Arc;

use skycast_core::{FetchError, LocationError, Units};
use skycast_weather::{
    Coordinates, ForecastResponse, LocationProvider, LocationRequest, WeatherClient,
};
use tokio::sync::mpsc;

use crate::sequence::Ticket;

/// What a forecast fetch was issued for.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOrigin {
    Coordinates(Coordinates),
    City(String),
}

impl FetchOrigin {
    pub fn is_city(&self) -> bool {
        matches!(self, FetchOrigin::City(_))
    }
}

impl std::fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOrigin::Coordinates(coords) => write!(f, "({})", coords),
            FetchOrigin::City(name) => write!(f, "'{}'", name),
        }
    }
}

/// Messages sent from async operations back to the screen
#[derive(Debug)]
pub enum ScreenMessage {
    /// Result of the one-shot location query
    LocationDone(Result<Coordinates, LocationError>),
    /// The debounce window for `term` closed
    SearchSettled { term: String },
    /// A forecast fetch finished. `Ok(None)` means the query was too short.
    ForecastDone {
        ticket: Ticket,
        origin: FetchOrigin,
        units: Units,
        result: Result<Option<ForecastResponse>, FetchError>,
    },
}

pub type ScreenSender = mpsc::UnboundedSender<ScreenMessage>;

/// Query the location provider once. Sends `LocationDone` when complete.
pub fn request_location(
    tx: &ScreenSender,
    provider: Arc<LocationProvider>,
    request: LocationRequest,
) {
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = provider.get_current_location(request).await;
        if let Err(e) = &result {
            tracing::warn!("Location query failed: {}", e);
        }
        let _ = tx.send(ScreenMessage::LocationDone(result));
    });
}

/// Fetch a forecast for `origin`. Sends `ForecastDone` tagged with `ticket`.
pub fn request_forecast(
    tx: &ScreenSender,
    client: Arc<WeatherClient>,
    ticket: Ticket,
    origin: FetchOrigin,
    units: Units,
) {
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = match &origin {
            FetchOrigin::Coordinates(coords) => {
                client.fetch_by_coordinates(*coords, units).await.map(Some)
            }
            FetchOrigin::City(query) => client.fetch_by_city_name(query, units).await,
        };
        if let Err(e) = &result {
            tracing::error!("Forecast {} for {} failed: {}", ticket, origin, e);
        }
        let _ = tx.send(ScreenMessage::ForecastDone {
            ticket,
            origin,
            units,
            result,
        });
    });
}

/// Post `SearchSettled`; used as the debounced action.
pub fn settle_search(tx: &ScreenSender, term: String) {
    let _ = tx.send(ScreenMessage::SearchSettled { term });
}
