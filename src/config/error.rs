//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid operator chat id: {0:?}")]
    InvalidOperatorId(String),

    #[error("Invalid UTC offset: {0:?}")]
    InvalidUtcOffset(String),

    #[error("Invalid long-poll timeout (expected 1..=50 seconds)")]
    InvalidPollTimeout,

    #[error("Invalid upload timeout (expected 1..=600 seconds)")]
    InvalidUploadTimeout,

    #[error("Invalid Bot API base URL")]
    InvalidApiBaseUrl,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
