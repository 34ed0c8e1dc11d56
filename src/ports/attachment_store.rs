//! Attachment Store port - hierarchical file storage for uploaded media.

use async_trait::async_trait;

use crate::domain::form::{AttachmentFolder, AttachmentRef};

/// Errors that can occur while storing attachments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentStoreError {
    /// The folder could not be created or shared. Callers fall back to the
    /// default folder.
    #[error("Folder unavailable: {0}")]
    FolderUnavailable(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Folder-based file store handing out public links.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Creates (best effort) a publicly readable folder `name` under `parent_id`.
    async fn ensure_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<AttachmentFolder, AttachmentStoreError>;

    /// Uploads `file` into `folder_id`, returning its public reference.
    async fn upload(
        &self,
        file: NewAttachment,
        folder_id: &str,
    ) -> Result<AttachmentRef, AttachmentStoreError>;
}
