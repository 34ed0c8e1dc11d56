//! In-memory adapters for tests and local development.

mod attachment_store;
mod gateway;
mod record_store;

pub use attachment_store::{CreatedFolder, InMemoryAttachmentStore, StoredAttachment};
pub use gateway::RecordingGateway;
pub use record_store::InMemoryRecordStore;
