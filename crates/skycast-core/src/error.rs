//! Centralized error types for SkyCast.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for alerts
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Errors that stop the weather screen from being built.
///
/// Use `user_message()` to get an alert-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Forecast fetch error: {0}")]
    Fetch(#[from] FetchError),

}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Location(e) => e.user_message().to_string(),
            AppError::Fetch(e) => e.user_message(),
        }
    }
}

/// Errors from the one-shot location query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service unavailable")]
    ServiceUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access was denied. Search for a city instead."
            }
            LocationError::ServiceUnavailable => {
                "Location is unavailable. Search for a city instead."
            }
            LocationError::Timeout => "Finding your location took too long. Search for a city instead.",
            LocationError::Other(_) => "Could not determine your location.",
        }
    }
}

/// Forecast fetch errors (network, API status, malformed body).
///
/// No variant is retried; every failure is terminal for its request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// The API answered with a `cod` other than "200".
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key")]
    MissingApiKey,
}

impl FetchError {
    /// Alert text. API errors surface the service's own message.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => "Unable to connect. Check your internet connection.".to_string(),
            FetchError::Timeout => "The request timed out. Please try again.".to_string(),
            FetchError::Api { message, .. } => message.clone(),
            FetchError::InvalidResponse(_) => {
                "Received an unexpected response from the weather service.".to_string()
            }
            FetchError::MissingApiKey => {
                "No weather API key configured. Set OPENWEATHER_API_KEY.".to_string()
            }
        }
    }
}

/// Local key-value storage errors. Logged and swallowed by callers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Serialization(_) => "Saved searches could not be read or written.",
            StorageError::Io(_) => "Saved searches could not be stored.",
            StorageError::Unavailable(_) => "Local storage is unavailable.",
        }
    }
}

/// A configuration value that could not be interpreted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_fetch_error(self) -> FetchError;
}

impl ReqwestErrorExt for reqwest::Error {
    /// The request URL is dropped: its query string carries the API key.
    fn into_fetch_error(self) -> FetchError {
        let err = self.without_url();
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
