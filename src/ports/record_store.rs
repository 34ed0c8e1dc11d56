//! Record Store port - append-only tabular persistence of form records.

use async_trait::async_trait;

/// Errors that can occur when appending a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordStoreError {
    /// Network or credential failure. No partial row was written.
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Append-only row store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Appends one row of cells, in column order.
    ///
    /// Must tolerate concurrent calls from independent sessions.
    async fn append_row(&self, values: &[String]) -> Result<(), RecordStoreError>;
}
