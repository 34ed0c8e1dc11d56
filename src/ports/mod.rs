//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the form and the outside world. Adapters implement these ports.
//!
//! - `MessagingGateway` - Outbound chat transport (replies, file download)
//! - `RecordStore` - Append-only row store for finalized records
//! - `AttachmentStore` - Folder/file store for uploaded media
//! - `ManagerDirectory` - Durable per-user manager name

mod attachment_store;
mod manager_directory;
mod messaging_gateway;
mod record_store;

pub use attachment_store::{AttachmentStore, AttachmentStoreError, NewAttachment};
pub use manager_directory::{DirectoryError, ManagerDirectory};
pub use messaging_gateway::{GatewayError, MessagingGateway};
pub use record_store::{RecordStore, RecordStoreError};
