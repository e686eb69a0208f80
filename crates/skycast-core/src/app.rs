use anyhow::Result;
use std::sync::Arc;

use crate::{Config, ValidationResult};

/// Application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        Ok(Self {
            config: Arc::new(config),
            validation,
        })
    }

    /// Create an application instance around an already-built configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let validation = config.validate();
        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }
        Ok(Self {
            config: Arc::new(config),
            validation,
        })
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the config
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Warnings collected while validating the config
    pub fn warnings(&self) -> &[crate::config::ConfigValidationError] {
        &self.validation.warnings
    }
}
