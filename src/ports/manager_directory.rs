//! Manager Directory port - durable `user_id -> manager_name` mapping.

use async_trait::async_trait;

use crate::domain::foundation::UserId;

/// Errors from the manager directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read manager directory: {0}")]
    ReadFailed(String),

    #[error("Failed to write manager directory: {0}")]
    WriteFailed(String),

    #[error("Manager directory is corrupt: {0}")]
    Corrupt(String),
}

/// Remembers the last manager name each user entered.
///
/// Writes are last-write-wins per user and survive restarts.
#[async_trait]
pub trait ManagerDirectory: Send + Sync {
    /// Returns the remembered manager name, `None` if the user has none.
    async fn get(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError>;

    /// Stores `manager_name` for `user_id`, replacing any earlier value.
    async fn set(&self, user_id: &UserId, manager_name: &str) -> Result<(), DirectoryError>;
}
