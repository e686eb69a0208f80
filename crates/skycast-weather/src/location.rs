//! One-shot device location.
//!
//! There is no platform geolocation here; positions come from fixed
//! configuration or a coarse IP lookup over HTTP.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use skycast_core::{LocationConfig, LocationError, LocationSource};
use tracing::instrument;

use crate::types::Coordinates;

const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Options for a single location query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }
}

impl LocationRequest {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// ip-api.com style answer: `{"status": "success", "lat": .., "lon": ..}`
/// or `{"status": "fail", "message": ".."}`.
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub enum LocationProvider {
    Fixed(Coordinates),
    IpLookup { client: Client, url: String },
    Disabled,
}

impl LocationProvider {
    pub fn fixed(coordinates: Coordinates) -> Self {
        LocationProvider::Fixed(coordinates)
    }

    pub fn ip_lookup(url: &str) -> Result<Self, LocationError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LocationError::Other(e.to_string()))?;
        Ok(LocationProvider::IpLookup {
            client,
            url: url.to_string(),
        })
    }

    pub fn disabled() -> Self {
        LocationProvider::Disabled
    }

    pub fn from_config(config: &LocationConfig) -> Result<Self, LocationError> {
        match config.source {
            LocationSource::Fixed => match (config.latitude, config.longitude) {
                (Some(lat), Some(lon)) => Ok(Self::fixed(Coordinates::new(lat, lon))),
                _ => Err(LocationError::Other(
                    "fixed location needs latitude and longitude".to_string(),
                )),
            },
            LocationSource::Ip => Self::ip_lookup(&config.ip_lookup_url),
            LocationSource::Disabled => Ok(Self::disabled()),
        }
    }

    /// Resolve the current position once. The whole query, network included,
    /// is bounded by `request.timeout`.
    #[instrument(skip(self), level = "info")]
    pub async fn get_current_location(
        &self,
        request: LocationRequest,
    ) -> Result<Coordinates, LocationError> {
        let coordinates = tokio::time::timeout(request.timeout, self.query(request))
            .await
            .map_err(|_| {
                tracing::warn!("Location query exceeded {:?}", request.timeout);
                LocationError::Timeout
            })??;

        if !coordinates.is_valid() {
            return Err(LocationError::Other(format!(
                "position out of range: {}",
                coordinates
            )));
        }

        tracing::info!("Location resolved to {}", coordinates);
        Ok(coordinates)
    }

    async fn query(&self, request: LocationRequest) -> Result<Coordinates, LocationError> {
        match self {
            LocationProvider::Fixed(coordinates) => Ok(*coordinates),
            LocationProvider::Disabled => Err(LocationError::ServiceUnavailable),
            LocationProvider::IpLookup { client, url } => {
                if request.high_accuracy {
                    tracing::debug!("IP lookup is city-level; high accuracy not available");
                }
                lookup_ip(client, url).await
            }
        }
    }
}

async fn lookup_ip(client: &Client, url: &str) -> Result<Coordinates, LocationError> {
    tracing::debug!("GET {}", url);
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            LocationError::Timeout
        } else {
            LocationError::ServiceUnavailable
        }
    })?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
        return Err(LocationError::PermissionDenied);
    }
    if !status.is_success() {
        tracing::error!("Location lookup returned {}", status);
        return Err(LocationError::ServiceUnavailable);
    }

    let body: IpLookupResponse = response
        .json()
        .await
        .map_err(|e| LocationError::Other(format!("unreadable location response: {}", e)))?;

    if body.status != "success" {
        return Err(LocationError::Other(
            body.message.unwrap_or_else(|| body.status.clone()),
        ));
    }

    match (body.lat, body.lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
        _ => Err(LocationError::Other("location response has no coordinates".to_string())),
    }
}
