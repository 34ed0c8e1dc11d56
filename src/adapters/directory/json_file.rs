//! JSON-file manager directory
//!
//! Stores `{ "<user_id>": { "manager_name": "<name>" } }` in a single file.
//! Writes go to a temporary sibling first and are renamed into place.
//! A file that no longer parses is moved to `<name>.corrupt` on the next
//! write and the directory starts over empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::foundation::UserId;
use crate::ports::{DirectoryError, ManagerDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DirectoryEntry {
    manager_name: String,
}

type Entries = BTreeMap<String, DirectoryEntry>;

/// File-backed manager directory
pub struct JsonFileManagerDirectory {
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl JsonFileManagerDirectory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as an empty directory.
    async fn load(&self) -> Result<Entries, DirectoryError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(DirectoryError::ReadFailed(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&raw).map_err(|e| DirectoryError::Corrupt(e.to_string()))
    }

    /// Entries to extend on write. A corrupt file is set aside so writes
    /// keep working.
    async fn load_for_write(&self) -> Result<Entries, DirectoryError> {
        match self.load().await {
            Err(DirectoryError::Corrupt(reason)) => {
                let backup = self.path.with_extension("corrupt");
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    reason = %reason,
                    "Manager directory unreadable, starting over"
                );
                fs::rename(&self.path, &backup).await.map_err(|e| {
                    DirectoryError::WriteFailed(format!("Failed to set aside corrupt file: {}", e))
                })?;
                Ok(Entries::new())
            }
            other => other,
        }
    }

    async fn store(&self, entries: &Entries) -> Result<(), DirectoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DirectoryError::WriteFailed(format!("Failed to create directory: {}", e)))?;
        }

        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| DirectoryError::WriteFailed(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, body).await.map_err(|e| {
            DirectoryError::WriteFailed(format!("Failed to write temporary file: {}", e))
        })?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DirectoryError::WriteFailed(format!("Failed to rename file: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ManagerDirectory for JsonFileManagerDirectory {
    async fn get(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        let entries = self.load().await?;
        Ok(entries
            .get(user_id.as_str())
            .map(|entry| entry.manager_name.clone()))
    }

    async fn set(&self, user_id: &UserId, manager_name: &str) -> Result<(), DirectoryError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_for_write().await?;
        entries.insert(
            user_id.as_str().to_string(),
            DirectoryEntry {
                manager_name: manager_name.to_string(),
            },
        );
        self.store(&entries).await?;
        tracing::debug!(user_id = %user_id, path = %self.path.display(), "Manager name stored");
        Ok(())
    }
}
