//! Recording Messaging Gateway
//!
//! Captures every reply instead of delivering it and serves registered files
//! for download. Recipients can be marked unreachable.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::form::{FileRef, Reply};
use crate::domain::foundation::UserId;
use crate::ports::{GatewayError, MessagingGateway};

#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    sent: Arc<RwLock<Vec<(UserId, Reply)>>>,
    files: Arc<RwLock<HashMap<FileRef, Vec<u8>>>>,
    unreachable: Arc<RwLock<HashSet<UserId>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers downloadable content for `file_ref`.
    pub async fn add_file(&self, file_ref: FileRef, bytes: impl Into<Vec<u8>>) {
        self.files.write().await.insert(file_ref, bytes.into());
    }

    /// Makes sends to `user_id` fail.
    pub async fn set_unreachable(&self, user_id: UserId) {
        self.unreachable.write().await.insert(user_id);
    }

    pub async fn sent(&self) -> Vec<(UserId, Reply)> {
        self.sent.read().await.clone()
    }

    /// Replies delivered to one recipient, in order.
    pub async fn sent_to(&self, user_id: &UserId) -> Vec<Reply> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|(to, _)| to == user_id)
            .map(|(_, reply)| reply.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send(&self, recipient: &UserId, reply: &Reply) -> Result<(), GatewayError> {
        if self.unreachable.read().await.contains(recipient) {
            return Err(GatewayError::Rejected {
                code: 403,
                description: format!("chat {} unreachable", recipient),
            });
        }
        self.sent
            .write()
            .await
            .push((recipient.clone(), reply.clone()));
        Ok(())
    }

    async fn download_to(&self, file: &FileRef, dest: &Path) -> Result<u64, GatewayError> {
        let bytes = self
            .files
            .read()
            .await
            .get(file)
            .cloned()
            .ok_or_else(|| GatewayError::FileUnavailable(file.as_str().to_string()))?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        Ok(bytes.len() as u64)
    }
}
