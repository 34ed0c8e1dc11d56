//! In-Memory Attachment Store Adapter
//!
//! Records folders and uploads in memory, with switches to fail folder
//! creation or uploads and to slow uploads down.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::form::{AttachmentFolder, AttachmentRef};
use crate::ports::{AttachmentStore, AttachmentStoreError, NewAttachment};

/// An upload as the store saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub name: String,
    pub mime_type: String,
    pub folder_id: String,
    pub size: usize,
    pub url: String,
}

/// A folder creation as the store saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFolder {
    pub name: String,
    pub parent_id: String,
    pub folder: AttachmentFolder,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAttachmentStore {
    folders: Arc<RwLock<Vec<CreatedFolder>>>,
    uploads: Arc<RwLock<Vec<StoredAttachment>>>,
    next_id: Arc<AtomicU64>,
    fail_folders: Arc<AtomicBool>,
    fail_uploads: Arc<AtomicBool>,
    upload_delay: Arc<RwLock<Duration>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_folders(&self, fail: bool) {
        self.fail_folders.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Delays every upload, for timeout tests.
    pub async fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.write().await = delay;
    }

    pub async fn folders(&self) -> Vec<CreatedFolder> {
        self.folders.read().await.clone()
    }

    pub async fn uploads(&self) -> Vec<StoredAttachment> {
        self.uploads.read().await.clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn ensure_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<AttachmentFolder, AttachmentStoreError> {
        if self.fail_folders.load(Ordering::SeqCst) {
            return Err(AttachmentStoreError::FolderUnavailable(format!(
                "cannot create {}",
                name
            )));
        }
        let id = format!("folder-{}", self.next_id());
        let folder = AttachmentFolder {
            link: format!("memory://folders/{}", id),
            id,
        };
        self.folders.write().await.push(CreatedFolder {
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            folder: folder.clone(),
        });
        Ok(folder)
    }

    async fn upload(
        &self,
        file: NewAttachment,
        folder_id: &str,
    ) -> Result<AttachmentRef, AttachmentStoreError> {
        let delay = *self.upload_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AttachmentStoreError::UploadFailed(format!(
                "cannot store {}",
                file.name
            )));
        }
        let url = format!("memory://files/file-{}", self.next_id());
        self.uploads.write().await.push(StoredAttachment {
            name: file.name,
            mime_type: file.mime_type,
            folder_id: folder_id.to_string(),
            size: file.bytes.len(),
            url: url.clone(),
        });
        Ok(AttachmentRef::new(url))
    }
}
