//! OpenWeather forecast client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use skycast_core::{Config, FetchError, ReqwestErrorExt, Units};
use tracing::instrument;

use crate::api::ForecastResponse;
use crate::types::Coordinates;

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
const FORECAST_PATH: &str = "/forecast";
const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Queries with fewer characters than this never reach the network.
pub const MIN_QUERY_CHARS: usize = 3;

/// Issues single, unretried GETs against the `/forecast` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    min_query_chars: usize,
}

impl WeatherClient {
    pub fn new(api_key: &str) -> Result<Self, FetchError> {
        Self::with_base_url(api_key, OPENWEATHER_API_BASE)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, FetchError> {
        Self::build(api_key, base_url, None)
    }

    /// Build from the `[weather]` and `[search]` config sections.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let api_key = config.api_key().ok_or(FetchError::MissingApiKey)?;
        let timeout = config.weather.request_timeout_secs.map(Duration::from_secs);
        let client = Self::build(api_key, &config.weather.base_url, timeout)?;
        Ok(client.with_min_query_chars(config.search.min_query_chars))
    }

    fn build(api_key: &str, base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        if api_key.trim().is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            min_query_chars: MIN_QUERY_CHARS,
        })
    }

    /// Values below `MIN_QUERY_CHARS` are raised to it.
    pub fn with_min_query_chars(mut self, min_query_chars: usize) -> Self {
        self.min_query_chars = min_query_chars.max(MIN_QUERY_CHARS);
        self
    }

    pub fn min_query_chars(&self) -> usize {
        self.min_query_chars
    }

    /// True if `query` is long enough to be sent.
    pub fn is_searchable(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.min_query_chars
    }

    /// Forecast for a position.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_by_coordinates(
        &self,
        coordinates: Coordinates,
        units: Units,
    ) -> Result<ForecastResponse, FetchError> {
        let params = [
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
            ("units", units.as_query().to_string()),
        ];
        self.get_forecast(&params).await
    }

    /// Forecast for a free-text city query.
    ///
    /// Returns `Ok(None)` without a request when the trimmed query is too
    /// short; callers treat that as "cleared".
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_by_city_name(
        &self,
        query: &str,
        units: Units,
    ) -> Result<Option<ForecastResponse>, FetchError> {
        let query = query.trim();
        if !self.is_searchable(query) {
            tracing::debug!("Query '{}' below {} chars, not fetching", query, self.min_query_chars);
            return Ok(None);
        }

        let params = [
            ("q", query.to_string()),
            ("units", units.as_query().to_string()),
        ];
        self.get_forecast(&params).await.map(Some)
    }

    async fn get_forecast(&self, params: &[(&str, String)]) -> Result<ForecastResponse, FetchError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);
        tracing::debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_fetch_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ReqwestErrorExt::into_fetch_error)?;

        let forecast = handle_body(status, &body)?;
        tracing::info!(
            "Fetched {} forecast slots for {}",
            forecast.list.len(),
            forecast.city_name()
        );
        Ok(forecast)
    }
}

/// Interpret a response body. The `cod` field decides success, not the HTTP
/// status; a non-JSON error page falls back to the HTTP status.
fn handle_body(status: StatusCode, body: &str) -> Result<ForecastResponse, FetchError> {
    let parsed: ForecastResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_success() => {
            return Err(FetchError::InvalidResponse(format!("JSON parse error: {}", e)));
        }
        Err(_) => {
            return Err(FetchError::Api {
                code: status.as_u16().to_string(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }
    };

    if !parsed.is_success() {
        let message = parsed.error_message();
        tracing::error!("Forecast API returned {}: {}", parsed.cod, message);
        return Err(FetchError::Api {
            code: parsed.cod,
            message,
        });
    }

    if parsed.city.is_none() {
        return Err(FetchError::InvalidResponse(
            "response has no city block".to_string(),
        ));
    }

    Ok(parsed)
}
