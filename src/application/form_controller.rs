//! FormController - drives the stage transition table one event at a time.
//!
//! A turn takes the user's conversation out of the session table, applies
//! one inbound event and puts the resulting conversation back. Every error is
//! session scoped and ends up as a reply.

use std::sync::Arc;

use chrono::FixedOffset;
use futures::future::join_all;

use super::attachment_relay::AttachmentRelay;
use super::session_table::SessionTable;
use crate::domain::form::prompts::{self, BTN_FINISH, BTN_RESTART, BTN_START_REQUEST};
use crate::domain::form::{
    AttachmentRef, Command, Conversation, EventPayload, Expect, FieldKey, FieldValue, FormError,
    FormFlow, FormRecord, InboundEvent, MediaFile, MediaKind, Reply, Session, Stage, TextRule,
};
use crate::domain::foundation::{FormSessionId, Timestamp, UserId};
use crate::ports::{ManagerDirectory, MessagingGateway, RecordStore};

/// What a turn did.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// A fresh session was opened at this stage.
    Started(Stage),
    /// The answer was stored and the session moved to this stage.
    Advanced(Stage),
    /// The answer was refused; stage and fields are unchanged.
    Rejected(FormError),
    AttachmentStored(AttachmentRef),
    /// Upload failed; the user stays at the media stage.
    AttachmentFailed(FormError),
    /// A single-upload form already holds its attachment.
    AttachmentLimit,
    /// The record was appended and operators were notified.
    Finalized(FormSessionId),
    /// Finalization did not happen.
    NotFinalized(FormError),
    Cancelled,
    /// Waiting for a new manager name.
    AwaitingManager,
    ManagerChanged,
    /// No form open; the user was pointed at the start button.
    Idle,
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Reply for the user who sent the event.
    pub reply: Option<Reply>,
    pub outcome: TurnOutcome,
}

impl Turn {
    fn new(reply: Reply, outcome: TurnOutcome) -> Self {
        Self {
            reply: Some(reply),
            outcome,
        }
    }
}

/// Drives conversations through the form.
pub struct FormController {
    flow: FormFlow,
    sessions: SessionTable,
    relay: AttachmentRelay,
    records: Arc<dyn RecordStore>,
    directory: Arc<dyn ManagerDirectory>,
    gateway: Arc<dyn MessagingGateway>,
    operators: Vec<UserId>,
    utc_offset: FixedOffset,
}

impl FormController {
    pub fn new(
        flow: FormFlow,
        relay: AttachmentRelay,
        records: Arc<dyn RecordStore>,
        directory: Arc<dyn ManagerDirectory>,
        gateway: Arc<dyn MessagingGateway>,
        operators: Vec<UserId>,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            flow,
            sessions: SessionTable::new(),
            relay,
            records,
            directory,
            gateway,
            operators,
            utc_offset,
        }
    }

    pub fn flow(&self) -> &FormFlow {
        &self.flow
    }

    /// Current conversation of `user_id`.
    pub async fn conversation(&self, user_id: &UserId) -> Conversation {
        self.sessions.snapshot(user_id).await
    }

    /// Number of users with an open conversation.
    pub async fn active_conversations(&self) -> usize {
        self.sessions.len().await
    }

    /// Applies one inbound event.
    ///
    /// Turns for the same user are serialized; the reply is returned rather
    /// than sent.
    pub async fn handle(&self, event: InboundEvent) -> Turn {
        let mut guard = self.sessions.checkout(&event.user_id).await;
        let current = std::mem::take(&mut *guard);
        let (next, turn) = self.step(current, &event).await;
        *guard = next;
        self.sessions.checkin(&event.user_id, guard).await;
        turn
    }

    async fn step(&self, current: Conversation, event: &InboundEvent) -> (Conversation, Turn) {
        match &event.payload {
            EventPayload::Command(Command::Start) => self.start_form(event, true).await,
            EventPayload::Button(id) if id == BTN_START_REQUEST || id == BTN_RESTART => {
                self.start_form(event, false).await
            }
            EventPayload::Command(Command::Cancel) => {
                if let Conversation::Filling(session) = &current {
                    tracing::info!(
                        user_id = %event.user_id,
                        session_id = %session.id(),
                        stage = %session.stage(),
                        "Form cancelled"
                    );
                }
                (
                    Conversation::Idle,
                    Turn::new(
                        Reply::html(prompts::CANCELLED)
                            .with_buttons(vec![prompts::start_request_button()]),
                        TurnOutcome::Cancelled,
                    ),
                )
            }
            EventPayload::Command(Command::ChangeManager) => {
                tracing::info!(user_id = %event.user_id, "Manager change requested");
                (
                    Conversation::ChangingManager,
                    Turn::new(
                        Reply::html(prompts::CHANGE_MANAGER),
                        TurnOutcome::AwaitingManager,
                    ),
                )
            }
            _ => match current {
                Conversation::Idle => (
                    Conversation::Idle,
                    Turn::new(
                        Reply::html(prompts::IDLE).with_buttons(vec![prompts::start_request_button()]),
                        TurnOutcome::Idle,
                    ),
                ),
                Conversation::ChangingManager => self.change_manager(event).await,
                Conversation::Filling(session) => self.answer(session, event).await,
            },
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::now_in(self.utc_offset)
    }

    /// Opens a fresh session, replacing whatever the user had.
    async fn start_form(&self, event: &InboundEvent, greet: bool) -> (Conversation, Turn) {
        let manager = match self.directory.get(&event.user_id).await {
            Ok(manager) => manager,
            Err(e) => {
                tracing::warn!(user_id = %event.user_id, error = %e, "Manager lookup failed");
                None
            }
        };

        let entry = self.flow.entry_stage(manager.is_some());
        let session = Session::start(event.user_id.clone(), entry, manager.clone(), self.now());
        tracing::info!(
            user_id = %event.user_id,
            session_id = %session.id(),
            stage = %entry,
            manager_known = manager.is_some(),
            "Form started"
        );

        let prompt = self.flow.prompt(entry);
        let text = if greet {
            prompts::greeting(event.display_name.as_deref(), manager.as_deref(), &prompt.text)
        } else {
            prompts::resume_prompt(manager.as_deref(), &prompt.text)
        };

        (
            Conversation::Filling(session),
            Turn::new(text.with_markup(prompt.markup), TurnOutcome::Started(entry)),
        )
    }

    async fn change_manager(&self, event: &InboundEvent) -> (Conversation, Turn) {
        let raw = match &event.payload {
            EventPayload::Text(raw) => raw,
            _ => {
                return (
                    Conversation::ChangingManager,
                    Turn::new(
                        Reply::html(format!("{}\n{}", prompts::TEXT_EXPECTED, prompts::CHANGE_MANAGER)),
                        TurnOutcome::AwaitingManager,
                    ),
                )
            }
        };

        let name = match TextRule::FreeText.apply(FieldKey::ManagerName.as_str(), raw) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(user_id = %event.user_id, error = %e, "Manager name rejected");
                return (
                    Conversation::ChangingManager,
                    Turn::new(
                        Reply::html(prompts::MANAGER_NAME_RETRY),
                        TurnOutcome::Rejected(FormError::validation(Stage::ManagerName, e)),
                    ),
                );
            }
        };

        match self.directory.set(&event.user_id, &name).await {
            Ok(()) => {
                tracing::info!(user_id = %event.user_id, "Manager name changed");
                (
                    Conversation::Idle,
                    Turn::new(prompts::manager_changed(&name), TurnOutcome::ManagerChanged),
                )
            }
            Err(e) => {
                tracing::error!(user_id = %event.user_id, error = %e, "Manager name not stored");
                (
                    Conversation::ChangingManager,
                    Turn::new(
                        Reply::html(prompts::CHANGE_MANAGER_FAILED),
                        TurnOutcome::AwaitingManager,
                    ),
                )
            }
        }
    }

    /// Applies an event to an in-progress form.
    async fn answer(&self, mut session: Session, event: &InboundEvent) -> (Conversation, Turn) {
        let stage = session.stage();
        let spec = self.flow.spec(stage);

        let turn = match (spec.expect, &event.payload) {
            (Expect::Media, EventPayload::Button(id)) if id == BTN_FINISH => {
                return self.finalize(session).await;
            }
            (Expect::Media, EventPayload::Media(media)) => self.attach(&mut session, media).await,
            (Expect::Media, payload) => self.reject(
                &session,
                FormError::unexpected(stage, "a photo or video", payload.kind()),
            ),

            (Expect::Text(_), EventPayload::Text(raw)) => match spec.parse_text(raw) {
                Ok((field, value)) => {
                    if field == FieldKey::ManagerName {
                        self.remember_manager(&session, &value).await;
                    }
                    session.record(field, value);
                    self.advance(&mut session, self.flow.next_stage(stage))
                }
                Err(e @ FormError::NoAnswerField(_)) => {
                    tracing::error!(user_id = %session.user_id(), stage = %stage, error = %e, "Answer not stored");
                    Turn::new(self.flow.retry_prompt(stage), TurnOutcome::Rejected(e))
                }
                Err(e) => self.reject(&session, e),
            },
            (Expect::Text(_), payload) => {
                let err = FormError::unexpected(stage, "text", payload.kind());
                tracing::warn!(user_id = %session.user_id(), stage = %stage, error = %err, "Answer rejected");
                let prompt = self.flow.prompt(stage);
                Turn::new(
                    Reply::html(format!("{}\n{}", prompts::TEXT_EXPECTED, prompt.text))
                        .with_markup(prompt.markup),
                    TurnOutcome::Rejected(err),
                )
            }

            (Expect::Choice(_), EventPayload::Button(id)) => match self.flow.choice(stage, id) {
                Some(option) => {
                    if let Some(field) = spec.field {
                        session.record(field, FieldValue::Choice(option.value.to_string()));
                    }
                    for cleared in option.clears {
                        session.record(*cleared, FieldValue::Empty);
                    }
                    self.advance(&mut session, self.flow.after_choice(stage, option))
                }
                None => self.reject(
                    &session,
                    FormError::unexpected(stage, "one of the offered buttons", event.payload.kind()),
                ),
            },
            (Expect::Choice(_), payload) => self.reject(
                &session,
                FormError::unexpected(stage, "a button press", payload.kind()),
            ),

            (Expect::Location, EventPayload::Location(point)) => {
                session.record(FieldKey::LocationLink, FieldValue::Location(*point));
                self.advance(&mut session, self.flow.next_stage(stage))
            }
            (Expect::Location, payload) => self.reject(
                &session,
                FormError::unexpected(stage, "a location", payload.kind()),
            ),
        };

        (Conversation::Filling(session), turn)
    }

    /// Writes a freshly entered manager name through to the directory.
    async fn remember_manager(&self, session: &Session, value: &FieldValue) {
        if let Err(e) = self.directory.set(session.user_id(), &value.render()).await {
            tracing::warn!(user_id = %session.user_id(), error = %e, "Manager name not remembered");
        }
    }

    fn advance(&self, session: &mut Session, next: Option<Stage>) -> Turn {
        let from = session.stage();
        let Some(next) = next else {
            tracing::error!(user_id = %session.user_id(), stage = %from, "No stage after answer");
            return Turn::new(self.flow.prompt(from), TurnOutcome::Advanced(from));
        };
        match session.advance_to(next) {
            Ok(()) => {
                tracing::debug!(
                    user_id = %session.user_id(),
                    session_id = %session.id(),
                    from = %from,
                    to = %next,
                    "Stage advanced"
                );
                Turn::new(self.flow.prompt(next), TurnOutcome::Advanced(next))
            }
            Err(e) => {
                tracing::error!(user_id = %session.user_id(), error = %e, "Stage transition refused");
                Turn::new(self.flow.prompt(from), TurnOutcome::Advanced(from))
            }
        }
    }

    fn reject(&self, session: &Session, err: FormError) -> Turn {
        tracing::warn!(
            user_id = %session.user_id(),
            stage = %session.stage(),
            error = %err,
            "Answer rejected"
        );
        Turn::new(
            self.flow.retry_prompt(session.stage()),
            TurnOutcome::Rejected(err),
        )
    }

    async fn attach(&self, session: &mut Session, media: &MediaFile) -> Turn {
        let multi_upload = self.flow.capabilities().multi_upload;
        if !multi_upload && !session.attachments().is_empty() {
            return Turn::new(
                Reply::html(prompts::UPLOAD_LIMIT).with_buttons(vec![prompts::finish_button()]),
                TurnOutcome::AttachmentLimit,
            );
        }

        match self.relay.relay(session, media, self.now()).await {
            Ok(attachment) => {
                let label = match media.kind {
                    MediaKind::Photo => "Фото",
                    MediaKind::Video => "Видео",
                };
                Turn::new(
                    prompts::upload_succeeded(label, multi_upload),
                    TurnOutcome::AttachmentStored(attachment),
                )
            }
            Err(e) => Turn::new(
                Reply::html(prompts::UPLOAD_FAILED).with_buttons(vec![prompts::finish_button()]),
                TurnOutcome::AttachmentFailed(e),
            ),
        }
    }

    async fn finalize(&self, session: Session) -> (Conversation, Turn) {
        let record = match FormRecord::from_session(&self.flow, &session, self.now()) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    user_id = %session.user_id(),
                    session_id = %session.id(),
                    error = %e,
                    "Form incomplete at finalization"
                );
                return (
                    Conversation::Idle,
                    Turn::new(
                        Reply::html(prompts::INCOMPLETE)
                            .with_buttons(vec![prompts::start_request_button()]),
                        TurnOutcome::NotFinalized(e),
                    ),
                );
            }
        };

        if let Err(e) = self.records.append_row(&record.to_row()).await {
            tracing::error!(
                user_id = %session.user_id(),
                session_id = %session.id(),
                error = %e,
                "Record append failed"
            );
            return (
                Conversation::Filling(session),
                Turn::new(
                    Reply::html(prompts::SAVE_FAILED).with_buttons(vec![
                        prompts::finish_button(),
                        prompts::restart_button(),
                    ]),
                    TurnOutcome::NotFinalized(FormError::StoreUnavailable(e.to_string())),
                ),
            );
        }
        tracing::info!(
            user_id = %session.user_id(),
            session_id = %session.id(),
            attachments = session.attachments().len(),
            "Record appended"
        );

        self.notify_operators(&record).await;

        (
            Conversation::Idle,
            Turn::new(
                Reply::html(prompts::SAVED).with_buttons(vec![prompts::start_request_button()]),
                TurnOutcome::Finalized(record.session_id()),
            ),
        )
    }

    /// Sends the summary to every operator concurrently; failures are logged.
    async fn notify_operators(&self, record: &FormRecord) {
        let summary = Reply::html(record.operator_summary());
        let deliveries = self.operators.iter().map(|operator| {
            let summary = &summary;
            async move { (operator, self.gateway.send(operator, summary).await) }
        });

        for (operator, result) in join_all(deliveries).await {
            match result {
                Ok(()) => tracing::debug!(operator = %operator, "Operator notified"),
                Err(e) => tracing::error!(
                    operator = %operator,
                    session_id = %record.session_id(),
                    error = %e,
                    "Operator notification failed"
                ),
            }
        }
    }
}
