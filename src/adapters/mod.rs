//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the form to external systems:
//! - `telegram` - Bot API messaging gateway and long-poll loop
//! - `google` - Sheets record store and Drive attachment store
//! - `directory` - Manager directory (JSON file, in-memory)
//! - `memory` - In-memory stores and gateway for tests and local runs

pub mod directory;
pub mod google;
pub mod memory;
pub mod telegram;

pub use directory::{InMemoryManagerDirectory, JsonFileManagerDirectory};
pub use google::{GoogleDriveAttachmentStore, GoogleSheetsRecordStore, ServiceAccountAuth};
pub use memory::{InMemoryAttachmentStore, InMemoryRecordStore, RecordingGateway};
pub use telegram::{BotApiConfig, TelegramClient, UpdatePoller};
