//! Google service account and target resource configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Google Sheets and Drive configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Path to the service account JSON key
    pub credentials_file: PathBuf,

    /// Spreadsheet receiving one row per finished request
    pub spreadsheet_id: String,

    /// Worksheet inside the spreadsheet
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Parent folder for per-request folders, and the fallback upload target
    pub drive_folder_id: String,
}

impl GoogleConfig {
    /// Validate Google configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.credentials_file.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE__CREDENTIALS_FILE"));
        }
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE__SPREADSHEET_ID"));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE__SHEET_NAME"));
        }
        if self.drive_folder_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE__DRIVE_FOLDER_ID"));
        }
        Ok(())
    }
}

fn default_sheet_name() -> String {
    "telegram_bot".to_string()
}
