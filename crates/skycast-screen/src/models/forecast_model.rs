//! The weather screen controller.
//!
//! `ForecastScreen` owns all screen state. User events (text changes, button
//! presses) go in through its methods; async results come back as
//! `ScreenMessage`s and are applied by `handle_message`. Every state piece is
//! replaced as a whole value.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use skycast_core::{AppError, Config, FetchError, LocationError, Units};
use skycast_weather::{
    Coordinates, ForecastList, ForecastReducer, ForecastResponse, KeyValueStore,
    LocationProvider, LocationRequest, RecentLocation, RecentLocationsStore, SearchDebouncer,
    SelectionPolicy, WeatherClient,
};
use tokio::sync::mpsc;

use crate::sequence::{RequestSequence, Ticket};
use crate::services::{self, FetchOrigin, ScreenMessage, ScreenSender};

/// Search field contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub text: String,
    /// A debounced search is waiting to fire
    pub pending: bool,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct ScreenState {
    pub coordinates: Option<Coordinates>,
    pub forecast: Option<ForecastList>,
    pub search: SearchState,
    pub units: Units,
    pub recent: Vec<RecentLocation>,
    /// User-visible error text, shown until dismissed or replaced
    pub alert: Option<String>,
    /// A forecast fetch is in flight
    pub loading: bool,
    pub locating: bool,
}

pub struct ForecastScreen<S> {
    state: ScreenState,
    client: Arc<WeatherClient>,
    location: Arc<LocationProvider>,
    location_request: LocationRequest,
    recent_store: RecentLocationsStore<S>,
    debouncer: SearchDebouncer,
    sequence: RequestSequence,
    in_flight: Option<Ticket>,
    last_origin: Option<FetchOrigin>,
    tx: ScreenSender,
    rx: mpsc::UnboundedReceiver<ScreenMessage>,
}

impl<S: KeyValueStore> ForecastScreen<S> {
    /// Build a screen; the recent list is loaded from storage immediately.
    pub fn new(
        client: WeatherClient,
        location: LocationProvider,
        recent_store: RecentLocationsStore<S>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = ScreenState {
            recent: recent_store.load(),
            ..ScreenState::default()
        };

        Self {
            state,
            client: Arc::new(client),
            location: Arc::new(location),
            location_request: LocationRequest::default(),
            recent_store,
            debouncer: SearchDebouncer::default(),
            sequence: RequestSequence::new(),
            in_flight: None,
            last_origin: None,
            tx,
            rx,
        }
    }

    /// Build from configuration with `storage` backing the recent list.
    pub fn from_config(config: &Config, storage: S) -> Result<Self, AppError> {
        let client = WeatherClient::from_config(config)?;
        let location = LocationProvider::from_config(&config.location)?;

        Ok(Self::new(client, location, RecentLocationsStore::new(storage))
            .with_units(config.weather.units)
            .with_debounce(Duration::from_millis(config.search.debounce_ms))
            .with_location_request(LocationRequest::from_config(&config.location)))
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.state.units = units;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = SearchDebouncer::new(delay);
        self
    }

    pub fn with_location_request(mut self, request: LocationRequest) -> Self {
        self.location_request = request;
        self
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn recent_store(&self) -> &RecentLocationsStore<S> {
        &self.recent_store
    }

    /// True while a location query, debounce window or fetch is outstanding.
    pub fn is_busy(&self) -> bool {
        self.state.locating || self.state.search.pending || self.in_flight.is_some()
    }

    // =========== Events ===========

    /// Ask for the device location once. A successful answer fetches the
    /// local forecast unless the user has already searched.
    pub fn start(&mut self) {
        self.state.locating = true;
        services::request_location(&self.tx, self.location.clone(), self.location_request);
    }

    /// Use known coordinates without querying the provider.
    pub fn show_coordinates(&mut self, coordinates: Coordinates) {
        self.state.coordinates = Some(coordinates);
        self.fetch(FetchOrigin::Coordinates(coordinates));
    }

    /// The search text changed. The search itself runs once input settles.
    pub fn on_text_changed(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.state.search = SearchState {
            text: text.clone(),
            pending: true,
        };

        let tx = self.tx.clone();
        self.debouncer.schedule(text, move |term| async move {
            services::settle_search(&tx, term);
        });
    }

    /// Search for the current text right away.
    pub fn submit_search(&mut self) {
        self.debouncer.cancel();
        self.state.search.pending = false;
        let term = self.state.search.text.clone();
        self.search(&term);
    }

    /// Switch metric/imperial and refetch whatever was shown last.
    pub fn toggle_units(&mut self) {
        self.state.units = self.state.units.toggle();
        tracing::info!("Units switched to {}", self.state.units);

        if let Some(origin) = self.last_origin.clone() {
            self.fetch(origin);
        }
    }

    /// Search a city from the recent list. Returns false for a bad index.
    pub fn select_recent(&mut self, index: usize) -> bool {
        let Some(entry) = self.state.recent.get(index).cloned() else {
            return false;
        };

        self.debouncer.cancel();
        self.state.search = SearchState {
            text: entry.city_name.clone(),
            pending: false,
        };
        self.search(&entry.city_name);
        true
    }

    pub fn clear_recent(&mut self) {
        if let Err(e) = self.recent_store.clear() {
            tracing::warn!("Failed to clear recent locations: {}", e);
        }
        self.state.recent.clear();
    }

    pub fn dismiss_alert(&mut self) {
        self.state.alert = None;
    }

    // =========== Async results ===========

    /// Wait for the next async result. The screen holds a sender itself, so
    /// this only returns `None` if the channel is closed externally.
    pub async fn recv(&mut self) -> Option<ScreenMessage> {
        self.rx.recv().await
    }

    /// Apply every result that has already arrived. Returns how many.
    pub fn poll_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg);
            applied += 1;
        }
        applied
    }

    /// Process results until nothing is outstanding.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            match self.rx.recv().await {
                Some(msg) => self.handle_message(msg),
                None => break,
            }
        }
    }

    pub fn handle_message(&mut self, msg: ScreenMessage) {
        match msg {
            ScreenMessage::LocationDone(result) => self.apply_location(result),
            ScreenMessage::SearchSettled { term } => {
                if term != self.state.search.text {
                    tracing::debug!("Ignoring settled search '{}', text moved on", term);
                    return;
                }
                self.state.search.pending = false;
                self.search(&term);
            }
            ScreenMessage::ForecastDone {
                ticket,
                origin,
                units,
                result,
            } => {
                if !self.sequence.is_current(ticket) {
                    tracing::debug!("Discarding stale forecast {} for {}", ticket, origin);
                    return;
                }
                self.in_flight = None;
                self.state.loading = false;
                self.apply_forecast(origin, units, result);
            }
        }
    }

    // =========== Internals ===========

    fn search(&mut self, term: &str) {
        self.fetch(FetchOrigin::City(term.trim().to_string()));
    }

    fn fetch(&mut self, origin: FetchOrigin) {
        let ticket = self.sequence.issue();
        self.in_flight = Some(ticket);
        self.state.loading = true;
        self.last_origin = Some(origin.clone());

        tracing::debug!("Issuing forecast {} for {}", ticket, origin);
        services::request_forecast(
            &self.tx,
            self.client.clone(),
            ticket,
            origin,
            self.state.units,
        );
    }

    fn apply_location(&mut self, result: Result<Coordinates, LocationError>) {
        self.state.locating = false;
        match result {
            Ok(coordinates) => {
                if self.state.coordinates == Some(coordinates) {
                    return;
                }
                self.state.coordinates = Some(coordinates);

                let searched = self.last_origin.as_ref().is_some_and(FetchOrigin::is_city);
                if searched {
                    tracing::info!("Location arrived after a search; keeping search results");
                } else {
                    self.fetch(FetchOrigin::Coordinates(coordinates));
                }
            }
            Err(e) => {
                self.state.alert = Some(e.user_message().to_string());
            }
        }
    }

    fn apply_forecast(
        &mut self,
        origin: FetchOrigin,
        units: Units,
        result: Result<Option<ForecastResponse>, FetchError>,
    ) {
        match result {
            Ok(Some(response)) => {
                let policy = if origin.is_city() {
                    SelectionPolicy::search()
                } else {
                    SelectionPolicy::home()
                };
                let list = ForecastReducer::new(policy).reduce_response(&response, units, Utc::now());

                if origin.is_city() {
                    self.remember(&list.city_name);
                }
                tracing::info!(
                    "Showing {} days for {}",
                    list.entries.len(),
                    list.city_name
                );
                self.state.forecast = Some(list);
            }
            Ok(None) => {
                self.state.forecast = None;
            }
            Err(e) => {
                self.state.alert = Some(e.user_message());
                if origin.is_city() {
                    self.state.search.text.clear();
                }
            }
        }
    }

    fn remember(&mut self, city_name: &str) {
        if city_name.is_empty() {
            return;
        }
        let entry = RecentLocation::now(city_name);
        match self.recent_store.append(entry.clone()) {
            Ok(true) => self.state.recent.push(entry),
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to save recent location: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_weather::MemoryStore;

    fn screen() -> ForecastScreen<MemoryStore> {
        let client = WeatherClient::with_base_url("key", "http://127.0.0.1:9").unwrap();
        ForecastScreen::new(
            client,
            LocationProvider::disabled(),
            RecentLocationsStore::new(MemoryStore::new()),
        )
    }

    fn response(city: &str) -> ForecastResponse {
        serde_json::from_value(serde_json::json!({
            "cod": "200",
            "list": [{"dt": 1_709_280_000, "main": {"temp": 3.0, "humidity": 90}}],
            "city": {"name": city, "timezone": 0}
        }))
        .unwrap()
    }

    fn done(
        ticket: Ticket,
        origin: FetchOrigin,
        result: Result<Option<ForecastResponse>, FetchError>,
    ) -> ScreenMessage {
        ScreenMessage::ForecastDone {
            ticket,
            origin,
            units: Units::Metric,
            result,
        }
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let mut screen = screen();
        let old = screen.sequence.issue();
        let new = screen.sequence.issue();
        screen.in_flight = Some(new);

        screen.handle_message(done(old, FetchOrigin::City("Old".into()), Ok(Some(response("Old")))));
        assert!(screen.state().forecast.is_none());
        assert!(screen.is_busy());

        screen.handle_message(done(new, FetchOrigin::City("New".into()), Ok(Some(response("New")))));
        assert_eq!(screen.state().forecast.as_ref().map(|f| f.city_name.as_str()), Some("New"));
        assert!(!screen.is_busy());
    }

    #[tokio::test]
    async fn failed_city_search_clears_text_and_alerts() {
        let mut screen = screen();
        screen.state.search.text = "Atlantis".into();
        let ticket = screen.sequence.issue();

        screen.handle_message(done(
            ticket,
            FetchOrigin::City("Atlantis".into()),
            Err(FetchError::Api {
                code: "404".into(),
                message: "city not found".into(),
            }),
        ));

        assert_eq!(screen.state().alert.as_deref(), Some("city not found"));
        assert!(screen.state().search.text.is_empty());
        assert!(screen.state().recent.is_empty());
    }

    #[tokio::test]
    async fn failed_coordinate_fetch_keeps_state() {
        let mut screen = screen();
        let first = screen.sequence.issue();
        let origin = FetchOrigin::Coordinates(Coordinates::new(1.0, 2.0));
        screen.handle_message(done(first, origin.clone(), Ok(Some(response("Home")))));
        screen.state.search.text = "typed".into();

        let second = screen.sequence.issue();
        screen.handle_message(done(second, origin, Err(FetchError::Timeout)));

        assert_eq!(screen.state().forecast.as_ref().map(|f| f.city_name.as_str()), Some("Home"));
        assert_eq!(screen.state().search.text, "typed");
        assert!(screen.state().alert.is_some());
    }

    #[tokio::test]
    async fn cleared_result_empties_forecast() {
        let mut screen = screen();
        let first = screen.sequence.issue();
        screen.handle_message(done(first, FetchOrigin::City("Rome".into()), Ok(Some(response("Rome")))));
        assert!(screen.state().forecast.is_some());

        let second = screen.sequence.issue();
        screen.handle_message(done(second, FetchOrigin::City("R".into()), Ok(None)));
        assert!(screen.state().forecast.is_none());
    }

    #[tokio::test]
    async fn successful_search_is_remembered_once_per_record() {
        let mut screen = screen();
        let ticket = screen.sequence.issue();
        screen.handle_message(done(ticket, FetchOrigin::City("rome".into()), Ok(Some(response("Rome")))));

        // The API's spelling is stored, not the typed text
        assert_eq!(screen.state().recent.len(), 1);
        assert_eq!(screen.state().recent[0].city_name, "Rome");
        assert_eq!(screen.recent_store().load(), screen.state().recent);
    }

    #[tokio::test]
    async fn coordinate_fetch_is_not_remembered() {
        let mut screen = screen();
        let ticket = screen.sequence.issue();
        screen.handle_message(done(
            ticket,
            FetchOrigin::Coordinates(Coordinates::new(0.0, 0.0)),
            Ok(Some(response("Somewhere"))),
        ));
        assert!(screen.state().recent.is_empty());
    }

    #[tokio::test]
    async fn location_error_raises_alert() {
        let mut screen = screen();
        screen.state.locating = true;
        screen.handle_message(ScreenMessage::LocationDone(Err(LocationError::PermissionDenied)));

        assert!(!screen.state().locating);
        assert_eq!(
            screen.state().alert.as_deref(),
            Some(LocationError::PermissionDenied.user_message())
        );
        assert!(screen.state().forecast.is_none());
    }

    #[tokio::test]
    async fn late_location_does_not_override_search() {
        let mut screen = screen();
        screen.last_origin = Some(FetchOrigin::City("Paris".into()));
        let before = screen.sequence.latest();

        screen.handle_message(ScreenMessage::LocationDone(Ok(Coordinates::new(48.8, 2.3))));

        assert_eq!(screen.state().coordinates, Some(Coordinates::new(48.8, 2.3)));
        assert_eq!(screen.sequence.latest(), before);
    }

    #[tokio::test]
    async fn settled_search_for_old_text_is_ignored() {
        let mut screen = screen();
        screen.state.search = SearchState {
            text: "Berlin".into(),
            pending: true,
        };
        screen.handle_message(ScreenMessage::SearchSettled { term: "Ber".into() });

        assert!(screen.state().search.pending);
        assert_eq!(screen.sequence.latest(), None);
    }

    #[test]
    fn select_recent_out_of_range() {
        let mut screen = screen();
        assert!(!screen.select_recent(3));
    }

    #[test]
    fn clear_recent_empties_state_and_storage() {
        let mut screen = screen();
        screen
            .recent_store()
            .append(RecentLocation::new("Oslo", 1))
            .unwrap();
        screen.state.recent = screen.recent_store().load();

        screen.clear_recent();
        assert!(screen.state().recent.is_empty());
        assert!(screen.recent_store().load().is_empty());
    }
}
