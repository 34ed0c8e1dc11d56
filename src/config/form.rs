//! Form behaviour configuration

use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::form::FlowCapabilities;
use crate::domain::foundation::parse_utc_offset;

/// Form behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    /// Offset used for submission times and folder names
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Ask for a manager name when none is remembered
    #[serde(default = "default_true")]
    pub manager_name_required: bool,

    /// Ask for free-text location details after the location
    #[serde(default = "default_true")]
    pub location_info: bool,

    /// Accept more than one upload per request
    #[serde(default = "default_true")]
    pub multi_upload: bool,

    /// Bound on relaying one attachment
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Where downloaded media is staged; system temp dir when unset
    pub staging_dir: Option<PathBuf>,

    /// Manager directory file
    #[serde(default = "default_directory_path")]
    pub directory_path: PathBuf,
}

impl FormConfig {
    pub fn capabilities(&self) -> FlowCapabilities {
        FlowCapabilities {
            manager_name_required: self.manager_name_required,
            location_info: self.location_info,
            multi_upload: self.multi_upload,
        }
    }

    /// Parsed local offset.
    pub fn offset(&self) -> Result<FixedOffset, ValidationError> {
        parse_utc_offset(&self.utc_offset)
            .map_err(|_| ValidationError::InvalidUtcOffset(self.utc_offset.clone()))
    }

    /// Get upload timeout as Duration
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Validate form configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.offset()?;

        if !(1..=600).contains(&self.upload_timeout_secs) {
            return Err(ValidationError::InvalidUploadTimeout);
        }

        if self.directory_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("FORM__DIRECTORY_PATH"));
        }

        Ok(())
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            manager_name_required: true,
            location_info: true,
            multi_upload: true,
            upload_timeout_secs: default_upload_timeout(),
            staging_dir: None,
            directory_path: default_directory_path(),
        }
    }
}

fn default_utc_offset() -> String {
    // Asia/Tashkent, no DST
    "+05:00".to_string()
}

fn default_true() -> bool {
    true
}

fn default_upload_timeout() -> u64 {
    120
}

fn default_directory_path() -> PathBuf {
    PathBuf::from("users.json")
}
