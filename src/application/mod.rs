//! Application layer - drives the form over the ports.
//!
//! - `SessionTable` - explicit per-user conversation table
//! - `AttachmentRelay` - gateway file to attachment store
//! - `FormController` - one event in, one reply out
//! - `Dispatcher` - single logical worker per user

mod attachment_relay;
mod dispatcher;
mod form_controller;
mod session_table;

pub use attachment_relay::{AttachmentRelay, RelaySettings};
pub use dispatcher::{Dispatcher, DispatcherSettings};
pub use form_controller::{FormController, Turn, TurnOutcome};
pub use session_table::{ConversationGuard, SessionTable};
