//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `LEARNING_PROGRESS`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use learning_progress::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Connecting to {}", config.database.redacted_url());
//! ```

mod database;
mod error;
mod logging;
mod tracking;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use tracking::TrackingConfig;

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LEARNING_PROGRESS";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection and pool
    pub database: DatabaseConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Progress use-case tunables
    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `LEARNING_PROGRESS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `LEARNING_PROGRESS__DATABASE__URL=...` -> `database.url = ...`
    /// - `LEARNING_PROGRESS__LOGGING__JSON=true` -> `logging.json = true`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.logging.validate()?;
        self.tracking.validate()?;
        Ok(())
    }
}
