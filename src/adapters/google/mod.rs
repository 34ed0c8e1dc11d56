//! Google adapters: service account auth, Sheets record store, Drive
//! attachment store.

mod auth;
mod drive;
mod sheets;

pub use auth::{GoogleAuthError, ServiceAccountAuth, ServiceAccountKey, DRIVE_SCOPE, SHEETS_SCOPE};
pub use drive::GoogleDriveAttachmentStore;
pub use sheets::GoogleSheetsRecordStore;

/// Status and body of a failed API call, for error messages.
async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("{}: {}", status, body),
        _ => status.to_string(),
    }
}
