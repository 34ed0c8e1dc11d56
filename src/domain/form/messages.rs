//! Inbound events and outbound replies exchanged with the messaging gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::fields::GeoPoint;
use crate::domain::foundation::UserId;

/// Commands recognised at any point of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// `/start`: open the form.
    Start,
    /// `/cancel`: drop the form.
    Cancel,
    /// `/change_manager`: replace the remembered manager name.
    ChangeManager,
}

impl Command {
    /// Parses a slash command, tolerating a `@botname` suffix and arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let word = word.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "cancel" => Some(Command::Cancel),
            "change_manager" => Some(Command::ChangeManager),
            _ => None,
        }
    }
}

/// Gateway-side handle of a file, resolvable through the gateway only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Kind of media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// A photo or video sent by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub kind: MediaKind,
    pub file_ref: FileRef,
}

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    Text(String),
    /// Button press, carrying the button id.
    Button(String),
    Location(GeoPoint),
    Media(MediaFile),
    Command(Command),
    /// Anything the gateway delivers that the form has no use for.
    Unsupported,
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Text(_) => EventKind::Text,
            EventPayload::Button(_) => EventKind::Button,
            EventPayload::Location(_) => EventKind::Location,
            EventPayload::Media(MediaFile {
                kind: MediaKind::Photo,
                ..
            }) => EventKind::Photo,
            EventPayload::Media(MediaFile {
                kind: MediaKind::Video,
                ..
            }) => EventKind::Video,
            EventPayload::Command(_) => EventKind::Command,
            EventPayload::Unsupported => EventKind::Unsupported,
        }
    }
}

/// Coarse event classification, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Button,
    Location,
    Photo,
    Video,
    Command,
    Unsupported,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Text => "text",
            EventKind::Button => "button",
            EventKind::Location => "location",
            EventKind::Photo => "photo",
            EventKind::Video => "video",
            EventKind::Command => "command",
            EventKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// One inbound user event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user_id: UserId,
    /// Display name for greetings, when the gateway knows it.
    pub display_name: Option<String>,
    pub payload: EventPayload,
}

impl InboundEvent {
    pub fn new(user_id: UserId, payload: EventPayload) -> Self {
        Self {
            user_id,
            display_name: None,
            payload,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Text formatting of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Plain,
    #[default]
    Html,
}

/// An inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub label: String,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMarkup {
    #[default]
    None,
    /// One button per row.
    Inline(Vec<Button>),
    /// A one-shot keyboard asking the device for its location.
    RequestLocation { label: String },
    /// Dismiss a previously shown reply keyboard.
    RemoveKeyboard,
}

/// One outbound prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub format: TextFormat,
    pub markup: ReplyMarkup,
}

impl Reply {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            markup: ReplyMarkup::None,
        }
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_buttons(self, buttons: Vec<Button>) -> Self {
        self.with_markup(ReplyMarkup::Inline(buttons))
    }

    /// Ids of inline buttons, empty for other markups.
    pub fn button_ids(&self) -> Vec<&str> {
        match &self.markup {
            ReplyMarkup::Inline(buttons) => buttons.iter().map(|b| b.id.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}
