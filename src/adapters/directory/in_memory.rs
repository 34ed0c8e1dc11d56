//! In-memory manager directory for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::ports::{DirectoryError, ManagerDirectory};

#[derive(Debug, Clone, Default)]
pub struct InMemoryManagerDirectory {
    entries: Arc<RwLock<HashMap<UserId, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryManagerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a manager name without going through the port.
    pub async fn with_manager(self, user_id: UserId, manager_name: impl Into<String>) -> Self {
        self.entries
            .write()
            .await
            .insert(user_id, manager_name.into());
        self
    }

    /// Makes every read and write fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::ReadFailed("directory switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ManagerDirectory for InMemoryManagerDirectory {
    async fn get(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        self.check()?;
        Ok(self.entries.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &UserId, manager_name: &str) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::WriteFailed("directory switched off".to_string()));
        }
        self.entries
            .write()
            .await
            .insert(user_id.clone(), manager_name.to_string());
        Ok(())
    }
}
