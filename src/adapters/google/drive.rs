//! Google Drive attachment store.
//!
//! Folders and files are created under the configured parent and shared
//! read-only with anyone holding the link.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::auth::ServiceAccountAuth;
use super::error_body;
use crate::domain::form::{AttachmentFolder, AttachmentRef};
use crate::ports::{AttachmentStore, AttachmentStoreError, NewAttachment};

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Drive v3 adapter.
pub struct GoogleDriveAttachmentStore {
    auth: Arc<ServiceAccountAuth>,
    api_base_url: String,
}

impl GoogleDriveAttachmentStore {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            auth,
            api_base_url: "https://www.googleapis.com".to_string(),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn token(&self) -> Result<String, String> {
        self.auth.access_token().await.map_err(|e| e.to_string())
    }

    /// Makes `file_id` readable by anyone with the link.
    async fn share_publicly(&self, token: &str, file_id: &str) -> Result<(), String> {
        let response = self
            .auth
            .http()
            .post(format!(
                "{}/drive/v3/files/{}/permissions",
                self.api_base_url, file_id
            ))
            .bearer_auth(token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }
        Ok(())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<AttachmentFolder, String> {
        let token = self.token().await?;
        let response = self
            .auth
            .http()
            .post(format!("{}/drive/v3/files", self.api_base_url))
            .query(&[("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }
        let created: DriveFile = response.json().await.map_err(|e| e.to_string())?;

        if let Err(reason) = self.share_publicly(&token, &created.id).await {
            tracing::warn!(folder_id = %created.id, reason = %reason, "Folder not shared");
        }

        let link = created
            .web_view_link
            .unwrap_or_else(|| folder_link(&created.id));
        Ok(AttachmentFolder {
            id: created.id,
            link,
        })
    }

    async fn upload_file(&self, file: NewAttachment, folder_id: &str) -> Result<AttachmentRef, String> {
        let token = self.token().await?;
        let boundary = format!("power_intake_{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({ "name": file.name, "parents": [folder_id] });
        let body = multipart_related(&boundary, &metadata, &file.mime_type, &file.bytes);

        let response = self
            .auth
            .http()
            .post(format!("{}/upload/drive/v3/files", self.api_base_url))
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }
        let created: DriveFile = response.json().await.map_err(|e| e.to_string())?;

        if let Err(reason) = self.share_publicly(&token, &created.id).await {
            tracing::warn!(file_id = %created.id, reason = %reason, "File not shared");
        }

        let link = created.web_view_link.unwrap_or_else(|| file_link(&created.id));
        Ok(AttachmentRef::new(link))
    }
}

#[async_trait]
impl AttachmentStore for GoogleDriveAttachmentStore {
    async fn ensure_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<AttachmentFolder, AttachmentStoreError> {
        let folder = self
            .create_folder(name, parent_id)
            .await
            .map_err(AttachmentStoreError::FolderUnavailable)?;
        tracing::info!(folder = %name, folder_id = %folder.id, "Drive folder created");
        Ok(folder)
    }

    async fn upload(
        &self,
        file: NewAttachment,
        folder_id: &str,
    ) -> Result<AttachmentRef, AttachmentStoreError> {
        let name = file.name.clone();
        let size = file.bytes.len();
        let stored = self
            .upload_file(file, folder_id)
            .await
            .map_err(AttachmentStoreError::UploadFailed)?;
        tracing::info!(file = %name, size, folder_id = %folder_id, "File uploaded to Drive");
        Ok(stored)
    }
}

fn folder_link(id: &str) -> String {
    format!("https://drive.google.com/drive/folders/{}", id)
}

fn file_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", id)
}

/// `multipart/related` body: JSON metadata part followed by the media part.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
