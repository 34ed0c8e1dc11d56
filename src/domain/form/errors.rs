//! Session-scoped form errors.
//!
//! None of these is fatal: the controller turns each into a reply and keeps
//! (or discards) the session accordingly.

use thiserror::Error;

use super::fields::FieldKey;
use super::messages::EventKind;
use super::stage::Stage;
use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Answer had the right kind but the wrong shape.
    #[error("Invalid answer at {stage}: {source}")]
    Validation {
        stage: Stage,
        #[source]
        source: ValidationError,
    },

    /// E.g. text where a location was expected.
    #[error("Stage {stage} expects {expected}, got {got}")]
    UnexpectedInputKind {
        stage: Stage,
        expected: &'static str,
        got: EventKind,
    },

    #[error("Attachment upload failed: {0}")]
    UploadFailed(String),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stage takes a typed answer but the table names no field for it.
    #[error("Stage {0} has no field for its answer")]
    NoAnswerField(Stage),

    /// The active branch is missing answers at finalization.
    #[error("Record is missing fields: {}", display_keys(.missing))]
    IncompleteRecord { missing: Vec<FieldKey> },
}

fn display_keys(keys: &[FieldKey]) -> String {
    keys.iter()
        .map(FieldKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl FormError {
    pub fn validation(stage: Stage, source: ValidationError) -> Self {
        FormError::Validation { stage, source }
    }

    pub fn unexpected(stage: Stage, expected: &'static str, got: EventKind) -> Self {
        FormError::UnexpectedInputKind {
            stage,
            expected,
            got,
        }
    }

    /// Whether the user stays at the current stage and may simply answer again.
    pub fn is_reprompt(&self) -> bool {
        matches!(
            self,
            FormError::Validation { .. } | FormError::UnexpectedInputKind { .. }
        )
    }
}
