//! Power Intake - conversational intake of power-connection requests
//!
//! A Telegram bot walks a requester through a fixed form, validates every
//! answer, relays photos and videos to Google Drive, appends the finished
//! request to a Google Sheet and notifies operators.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
