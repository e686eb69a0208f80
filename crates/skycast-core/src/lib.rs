//! Core services for SkyCast: configuration, error taxonomy and logging.

pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{
    Config, ConfigValidationError, LocationConfig, LocationSource, SearchConfig, StorageConfig,
    Units, ValidationResult, WeatherConfig, API_KEY_ENV,
};
pub use error::{
    AppError, ConfigError, FetchError, LocationError, ReqwestErrorExt, StorageError,
};

use anyhow::Result;

/// Initialize logging with the given default filter.
///
/// `RUST_LOG` wins over `default_filter`. Output goes to stderr so rendered
/// forecasts on stdout stay clean.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("SkyCast core initialized");
    Ok(())
}
