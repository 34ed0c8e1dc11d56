//! Telegram Bot API configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::UserId;

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot credential token
    pub bot_token: Secret<String>,

    /// Comma-separated operator chat ids
    pub operators: String,

    /// Bot API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Long-poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl TelegramConfig {
    /// Get long-poll timeout as Duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Parses the operator list, skipping empty entries.
    pub fn operator_ids(&self) -> Result<Vec<UserId>, ValidationError> {
        self.operators
            .split(',')
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                raw.parse::<i64>()
                    .map(UserId::from)
                    .map_err(|_| ValidationError::InvalidOperatorId(raw.to_string()))
            })
            .collect()
    }

    /// Validate Telegram configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_token.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("TELEGRAM__BOT_TOKEN"));
        }

        if self.operator_ids()?.is_empty() {
            return Err(ValidationError::MissingRequired("TELEGRAM__OPERATORS"));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidApiBaseUrl);
        }

        if !(1..=50).contains(&self.poll_timeout_secs) {
            return Err(ValidationError::InvalidPollTimeout);
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}
