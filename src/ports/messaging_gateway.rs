//! Messaging Gateway port - chat transport seen from the form.
//!
//! Inbound events reach the application through the dispatcher; this port
//! covers the outbound half: sending replies and fetching user files.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::form::{FileRef, Reply};
use crate::domain::foundation::UserId;

/// Errors from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Network-level failure talking to the transport.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The transport answered but refused the request.
    #[error("Gateway rejected request ({code}): {description}")]
    Rejected { code: i64, description: String },

    /// The referenced file cannot be resolved or fetched.
    #[error("File unavailable: {0}")]
    FileUnavailable(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError::Transport(message.into())
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Delivers one reply to `recipient`.
    async fn send(&self, recipient: &UserId, reply: &Reply) -> Result<(), GatewayError>;

    /// Downloads the file behind `file` into `dest`, returning the byte count.
    ///
    /// # Errors
    /// * `GatewayError::FileUnavailable` - unknown or expired reference
    /// * `GatewayError::Io` - local write failed
    async fn download_to(&self, file: &FileRef, dest: &Path) -> Result<u64, GatewayError>;
}
