//! Per-user session state.

use serde::{Deserialize, Serialize};

use super::fields::{FieldKey, FieldValue, FormFields};
use super::stage::Stage;
use crate::domain::foundation::{FormSessionId, StateMachine, Timestamp, UserId, ValidationError};

/// A folder in the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFolder {
    pub id: String,
    /// Public link to the folder.
    pub link: String,
}

/// Where a session's uploads go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "folder", rename_all = "snake_case")]
pub enum FolderState {
    /// No upload attempted yet.
    #[default]
    Pending,
    /// A per-session folder was created.
    Dedicated(AttachmentFolder),
    /// Folder creation failed; uploads go to the shared default folder.
    Shared,
}

/// Public reference of one relayed attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One in-progress form.
///
/// `fields` only grows; the session is replaced, never rewound, on cancel or
/// restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: FormSessionId,
    user_id: UserId,
    stage: Stage,
    fields: FormFields,
    attachments: Vec<AttachmentRef>,
    folder: FolderState,
    started_at: Timestamp,
}

impl Session {
    /// Opens a session at `entry`, prefilling the remembered manager name.
    pub fn start(
        user_id: UserId,
        entry: Stage,
        manager_name: Option<String>,
        started_at: Timestamp,
    ) -> Self {
        let mut fields = FormFields::new();
        if let Some(name) = manager_name {
            fields.set(FieldKey::ManagerName, FieldValue::Text(name));
        }
        Self {
            id: FormSessionId::new(),
            user_id,
            stage: entry,
            fields,
            attachments: Vec::new(),
            folder: FolderState::Pending,
            started_at,
        }
    }

    pub fn id(&self) -> FormSessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// The dedicated folder, if one was created.
    pub fn folder(&self) -> Option<&AttachmentFolder> {
        match &self.folder {
            FolderState::Dedicated(folder) => Some(folder),
            _ => None,
        }
    }

    pub fn folder_state(&self) -> &FolderState {
        &self.folder
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn manager_name(&self) -> Option<String> {
        self.fields.non_blank(FieldKey::ManagerName)
    }

    /// Stores an answer.
    pub fn record(&mut self, key: FieldKey, value: FieldValue) {
        self.fields.set(key, value);
    }

    /// Moves to `target` along a declared edge.
    pub fn advance_to(&mut self, target: Stage) -> Result<(), ValidationError> {
        self.stage = self.stage.transition_to(target)?;
        Ok(())
    }

    pub fn add_attachment(&mut self, attachment: AttachmentRef) {
        self.attachments.push(attachment);
    }

    /// Remembers the folder used for this session's uploads.
    pub fn set_folder(&mut self, folder: AttachmentFolder) {
        self.folder = FolderState::Dedicated(folder);
    }

    /// Sends the rest of this session's uploads to the shared folder.
    pub fn use_shared_folder(&mut self) {
        self.folder = FolderState::Shared;
    }
}

/// What a user is doing right now.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Conversation {
    /// No form open.
    #[default]
    Idle,
    /// Waiting for a new manager name.
    ChangingManager,
    Filling(Session),
}

impl Conversation {
    pub fn is_idle(&self) -> bool {
        matches!(self, Conversation::Idle)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Conversation::Filling(session) => Some(session),
            _ => None,
        }
    }
}
