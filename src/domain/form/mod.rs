//! Conversational intake form.
//!
//! # Module Organization
//!
//! - `validators` - Pure field validators (phone, quantity, free text)
//! - `fields` - Field keys and collected values
//! - `stage` - Form stages and their forward edges
//! - `flow` - Declarative stage transition table and capability flags
//! - `session` - Per-user session state
//! - `record` - Finalized form record, row layout and operator summary
//! - `messages` - Inbound event and outbound reply contract
//! - `prompts` - Static prompt strings and reply builders

mod errors;
mod fields;
mod flow;
mod messages;
pub mod prompts;
mod record;
mod session;
mod stage;
mod validators;

pub use errors::FormError;
pub use fields::{FieldKey, FieldValue, FormFields, GeoPoint};
pub use flow::{ChoiceOption, Expect, FlowCapabilities, FormFlow, StageSpec, STAGE_TABLE};
pub use messages::{
    Button, Command, EventKind, EventPayload, FileRef, InboundEvent, MediaFile, MediaKind, Reply,
    ReplyMarkup, TextFormat,
};
pub use record::{FormRecord, ROW_WIDTH};
pub use session::{AttachmentFolder, AttachmentRef, Conversation, FolderState, Session};
pub use stage::Stage;
pub use validators::{validate_free_text, validate_phone, validate_quantity, TextRule};
