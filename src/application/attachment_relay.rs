//! Attachment relay: gateway file -> staging file -> attachment store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::form::{AttachmentRef, FolderState, FormError, MediaFile, Session};
use crate::domain::foundation::Timestamp;
use crate::ports::{AttachmentStore, MessagingGateway, NewAttachment};

/// Relay settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Shared folder, also the parent of per-session folders.
    pub default_folder_id: String,
    /// Where downloads are staged before upload.
    pub staging_dir: PathBuf,
    /// Bound on one relay attempt, download and upload together.
    pub timeout: Duration,
}

/// Moves one user file at a time into the attachment store.
pub struct AttachmentRelay {
    gateway: Arc<dyn MessagingGateway>,
    store: Arc<dyn AttachmentStore>,
    settings: RelaySettings,
}

impl AttachmentRelay {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<dyn AttachmentStore>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    /// Relays `media` into the session's folder and records the reference.
    ///
    /// The first call of a session creates the folder; if that fails the
    /// session switches to the shared folder for good. On error the session's
    /// attachments are unchanged.
    pub async fn relay(
        &self,
        session: &mut Session,
        media: &MediaFile,
        now: Timestamp,
    ) -> Result<AttachmentRef, FormError> {
        let folder_id = self.target_folder(session, &now).await;

        // removed on drop, whatever happens below
        let staged = tempfile::Builder::new()
            .prefix("power-intake-")
            .suffix(&format!(".{}", media.kind.extension()))
            .tempfile_in(&self.settings.staging_dir)
            .map_err(|e| FormError::UploadFailed(format!("cannot stage file: {}", e)))?;

        let name = format!(
            "{}_{}_{}.{}",
            media.kind.as_str(),
            session.user_id(),
            now.unix(),
            media.kind.extension()
        );

        let attempt = async {
            let size = self
                .gateway
                .download_to(&media.file_ref, staged.path())
                .await
                .map_err(|e| FormError::UploadFailed(e.to_string()))?;
            let bytes = tokio::fs::read(staged.path())
                .await
                .map_err(|e| FormError::UploadFailed(format!("cannot read staged file: {}", e)))?;
            tracing::debug!(file = %name, size, "Attachment staged");

            self.store
                .upload(
                    NewAttachment {
                        name: name.clone(),
                        mime_type: media.kind.mime_type().to_string(),
                        bytes,
                    },
                    &folder_id,
                )
                .await
                .map_err(|e| FormError::UploadFailed(e.to_string()))
        };

        let result = match timeout(self.settings.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(FormError::UploadFailed(format!(
                "timed out after {}s",
                self.settings.timeout.as_secs()
            ))),
        };
        drop(staged);

        match result {
            Ok(attachment) => {
                tracing::info!(
                    user_id = %session.user_id(),
                    session_id = %session.id(),
                    file = %name,
                    "Attachment relayed"
                );
                session.add_attachment(attachment.clone());
                Ok(attachment)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %session.user_id(),
                    session_id = %session.id(),
                    error = %e,
                    "Attachment relay failed"
                );
                Err(e)
            }
        }
    }

    async fn target_folder(&self, session: &mut Session, now: &Timestamp) -> String {
        match session.folder_state() {
            FolderState::Dedicated(folder) => return folder.id.clone(),
            FolderState::Shared => return self.settings.default_folder_id.clone(),
            FolderState::Pending => {}
        }

        let name = format!("Request_{}_{}", session.user_id(), now.to_folder_stamp());
        let created = timeout(
            self.settings.timeout,
            self.store
                .ensure_folder(&name, &self.settings.default_folder_id),
        )
        .await;

        match created {
            Ok(Ok(folder)) => {
                tracing::info!(user_id = %session.user_id(), folder = %name, "Attachment folder created");
                let id = folder.id.clone();
                session.set_folder(folder);
                id
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id = %session.user_id(), error = %e, "Folder unavailable, using default folder");
                session.use_shared_folder();
                self.settings.default_folder_id.clone()
            }
            Err(_) => {
                tracing::warn!(user_id = %session.user_id(), "Folder creation timed out, using default folder");
                session.use_shared_folder();
                self.settings.default_folder_id.clone()
            }
        }
    }
}
