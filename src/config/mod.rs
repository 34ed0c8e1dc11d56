//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `POWER_INTAKE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use power_intake::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Writing rows to sheet {}", config.google.sheet_name);
//! ```

mod error;
mod form;
mod google;
mod logging;
mod telegram;

pub use error::{ConfigError, ValidationError};
pub use form::FormConfig;
pub use google::GoogleConfig;
pub use logging::LoggingConfig;
pub use telegram::TelegramConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bot credentials and operator recipients
    pub telegram: TelegramConfig,

    /// Record and attachment store targets
    pub google: GoogleConfig,

    /// Form capabilities, timezone and local files
    #[serde(default)]
    pub form: FormConfig,

    /// Log filter and output format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `POWER_INTAKE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `POWER_INTAKE__TELEGRAM__BOT_TOKEN=...` -> `telegram.bot_token = ...`
    /// - `POWER_INTAKE__FORM__UTC_OFFSET=+05:00` -> `form.utc_offset = "+05:00"`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("POWER_INTAKE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.telegram.validate()?;
        self.google.validate()?;
        self.form.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
