//! Domain layer containing the intake form and its primitives.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine trait)
//! - `form` - Conversational form: validators, stage table, session, record

pub mod foundation;
pub mod form;
