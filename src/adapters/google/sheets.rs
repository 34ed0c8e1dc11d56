//! Google Sheets record store: one appended row per finished request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use super::auth::ServiceAccountAuth;
use super::error_body;
use crate::ports::{RecordStore, RecordStoreError};

/// Appends rows to one worksheet.
pub struct GoogleSheetsRecordStore {
    auth: Arc<ServiceAccountAuth>,
    api_base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl GoogleSheetsRecordStore {
    pub fn new(
        auth: Arc<ServiceAccountAuth>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            api_base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl RecordStore for GoogleSheetsRecordStore {
    async fn append_row(&self, values: &[String]) -> Result<(), RecordStoreError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| RecordStoreError::StoreUnavailable(e.to_string()))?;

        let response = self
            .auth
            .http()
            .post(append_url(&self.api_base_url, &self.spreadsheet_id, &self.sheet_name)?)
            .bearer_auth(token)
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| RecordStoreError::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let reason = error_body(response).await;
            tracing::error!(sheet = %self.sheet_name, reason = %reason, "Row append rejected");
            return Err(RecordStoreError::StoreUnavailable(reason));
        }

        tracing::info!(sheet = %self.sheet_name, columns = values.len(), "Row appended");
        Ok(())
    }
}

/// `values:append` endpoint for a worksheet; the sheet name is
/// percent-encoded as a path segment. Values are stored `RAW` so answers
/// like `+998901234567` or `=1+1` land in the cell exactly as typed.
fn append_url(base: &str, spreadsheet_id: &str, sheet_name: &str) -> Result<Url, RecordStoreError> {
    let range = format!("{}:append", sheet_name);
    let mut url = Url::parse(base)
        .map_err(|e| RecordStoreError::StoreUnavailable(format!("Invalid API URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| RecordStoreError::StoreUnavailable("Invalid API URL".to_string()))?
        .pop_if_empty()
        .extend([
            "v4",
            "spreadsheets",
            spreadsheet_id,
            "values",
            range.as_str(),
        ]);
    url.query_pairs_mut()
        .append_pair("valueInputOption", "RAW")
        .append_pair("insertDataOption", "INSERT_ROWS");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_url_targets_worksheet() {
        let url = append_url("https://sheets.googleapis.com", "sheet-1", "telegram_bot").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/telegram_bot:append\
             ?valueInputOption=RAW&insertDataOption=INSERT_ROWS"
        );
    }

    #[test]
    fn answers_are_not_parsed_by_sheets() {
        let url = append_url("https://sheets.googleapis.com", "s", "t").unwrap();
        let options: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(options.contains(&("valueInputOption".to_string(), "RAW".to_string())));
        assert!(!url.as_str().contains("USER_ENTERED"));
    }

    #[test]
    fn sheet_name_is_encoded() {
        let url = append_url("https://sheets.googleapis.com", "s", "Заявки 2024").unwrap();
        assert!(url.path().ends_with("/values/%D0%97%D0%B0%D1%8F%D0%B2%D0%BA%D0%B8%202024:append"));
    }

    #[test]
    fn relative_base_is_rejected() {
        assert!(matches!(
            append_url("sheets", "s", "t"),
            Err(RecordStoreError::StoreUnavailable(_))
        ));
    }
}
