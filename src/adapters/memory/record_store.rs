//! In-Memory Record Store Adapter
//!
//! Keeps appended rows in memory. Useful for testing and development.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{RecordStore, RecordStoreError};

/// In-memory append-only row store
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    rows: Arc<RwLock<Vec<Vec<String>>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following append fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of appended rows, in append order
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append_row(&self, values: &[String]) -> Result<(), RecordStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecordStoreError::StoreUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        self.rows.write().await.push(values.to_vec());
        Ok(())
    }
}
