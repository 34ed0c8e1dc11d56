//! Integration tests for the intake form.
//!
//! These tests drive the form end to end through the public API:
//! 1. Inbound events go through the controller (or the dispatcher)
//! 2. Attachments are relayed through the in-memory gateway and store
//! 3. Finished requests land in the record store as fixed-width rows
//! 4. Operators receive the summary
//!
//! Uses in-memory adapters so no network is involved.

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tempfile::TempDir;

use power_intake::adapters::{
    InMemoryAttachmentStore, InMemoryManagerDirectory, InMemoryRecordStore,
    JsonFileManagerDirectory, RecordingGateway,
};
use power_intake::application::{
    AttachmentRelay, Dispatcher, DispatcherSettings, FormController, RelaySettings, TurnOutcome,
};
use power_intake::domain::form::prompts::{
    self, BTN_CADASTR_NO, BTN_CADASTR_YES, BTN_FINISH, BTN_TRANSFORMER_NO, BTN_TRANSFORMER_YES,
    MEDIA_NOT_PROVIDED, NOT_PROVIDED,
};
use power_intake::domain::form::{
    Command, EventPayload, FieldKey, FileRef, FlowCapabilities, FormError, FormFlow, GeoPoint,
    InboundEvent, MediaFile, MediaKind, Stage, ROW_WIDTH,
};
use power_intake::domain::foundation::UserId;
use power_intake::ports::ManagerDirectory;

// =============================================================================
// Test Infrastructure
// =============================================================================

const MANAGER: usize = 0;
const CONTACT: usize = 2;
const PHONE: usize = 3;
const ADDRESS: usize = 4;
const CADASTR: usize = 5;
const TRANSFORMER: usize = 6;
const TRANSFORMER_POWER: usize = 7;
const FREE_POWER: usize = 8;
const STATION: usize = 9;
const MEDIA: usize = 10;
const LOCATION: usize = 11;
const LOCATION_INFO: usize = 12;

struct Bot {
    controller: Arc<FormController>,
    gateway: RecordingGateway,
    records: InMemoryRecordStore,
    attachments: InMemoryAttachmentStore,
    _staging: TempDir,
}

fn operator(n: u8) -> UserId {
    UserId::new(format!("op-{}", n)).unwrap()
}

fn bot_with(
    capabilities: FlowCapabilities,
    directory: Arc<dyn ManagerDirectory>,
    operators: Vec<UserId>,
) -> Bot {
    let gateway = RecordingGateway::new();
    let records = InMemoryRecordStore::new();
    let attachments = InMemoryAttachmentStore::new();
    let staging = TempDir::new().unwrap();

    let relay = AttachmentRelay::new(
        Arc::new(gateway.clone()),
        Arc::new(attachments.clone()),
        RelaySettings {
            default_folder_id: "shared-folder".into(),
            staging_dir: staging.path().to_path_buf(),
            timeout: Duration::from_secs(5),
        },
    );
    let controller = Arc::new(FormController::new(
        FormFlow::new(capabilities),
        relay,
        Arc::new(records.clone()),
        directory,
        Arc::new(gateway.clone()),
        operators,
        FixedOffset::east_opt(5 * 3600).unwrap(),
    ));

    Bot {
        controller,
        gateway,
        records,
        attachments,
        _staging: staging,
    }
}

fn bot(capabilities: FlowCapabilities) -> Bot {
    bot_with(
        capabilities,
        Arc::new(InMemoryManagerDirectory::new()),
        vec![operator(1), operator(2)],
    )
}

fn multi_upload() -> FlowCapabilities {
    FlowCapabilities {
        multi_upload: true,
        ..FlowCapabilities::minimal()
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn start(id: &str) -> InboundEvent {
    InboundEvent::new(user(id), EventPayload::Command(Command::Start))
}

fn text(id: &str, s: &str) -> InboundEvent {
    InboundEvent::new(user(id), EventPayload::Text(s.into()))
}

fn button(id: &str, button: &str) -> InboundEvent {
    InboundEvent::new(user(id), EventPayload::Button(button.into()))
}

fn location(id: &str) -> InboundEvent {
    InboundEvent::new(user(id), EventPayload::Location(GeoPoint::new(39.65, 66.96)))
}

fn media(id: &str, kind: MediaKind, file: &str) -> InboundEvent {
    InboundEvent::new(
        user(id),
        EventPayload::Media(MediaFile {
            kind,
            file_ref: FileRef::new(file),
        }),
    )
}

async fn stage_of(bot: &Bot, id: &str) -> Option<Stage> {
    bot.controller
        .conversation(&user(id))
        .await
        .session()
        .map(|s| s.stage())
}

/// Ali / 901234567 / Samarkand with neither cadastral number nor transformer.
async fn answer_basics_without_transformer(bot: &Bot, id: &str) {
    for answer in ["Ali", "901234567", "Samarkand"] {
        bot.controller.handle(text(id, answer)).await;
    }
    bot.controller.handle(button(id, BTN_CADASTR_NO)).await;
    let turn = bot.controller.handle(button(id, BTN_TRANSFORMER_NO)).await;
    assert_eq!(turn.outcome, TurnOutcome::Advanced(Stage::Location));
}

// =============================================================================
// Branching
// =============================================================================

#[tokio::test]
async fn no_transformer_jumps_to_location_and_empties_power_columns() {
    let bot = bot(FlowCapabilities::minimal());
    bot.controller.handle(start("1")).await;
    answer_basics_without_transformer(&bot, "1").await;

    let turn = bot.controller.handle(location("1")).await;
    assert_eq!(turn.outcome, TurnOutcome::Advanced(Stage::MediaUpload));

    let turn = bot.controller.handle(button("1", BTN_FINISH)).await;
    assert!(matches!(turn.outcome, TurnOutcome::Finalized(_)));

    let rows = bot.records.rows().await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.len(), ROW_WIDTH);
    assert_eq!(row[CONTACT], "Ali");
    assert_eq!(row[PHONE], "901234567");
    assert_eq!(row[ADDRESS], "Samarkand");
    assert_eq!(row[CADASTR], prompts::NO_VALUE);
    assert_eq!(row[TRANSFORMER], prompts::NO_VALUE);
    assert_eq!(row[TRANSFORMER_POWER], "");
    assert_eq!(row[FREE_POWER], "");
    assert_eq!(row[STATION], "");
    assert_eq!(row[MEDIA], MEDIA_NOT_PROVIDED);
    assert_eq!(row[LOCATION], "https://maps.google.com/?q=39.65,66.96");
    // stages switched off still keep their columns
    assert_eq!(row[MANAGER], NOT_PROVIDED);
    assert_eq!(row[LOCATION_INFO], NOT_PROVIDED);
}

#[tokio::test]
async fn full_path_records_every_answer() {
    let bot = bot(FlowCapabilities::default());
    bot.controller.handle(start("2")).await;
    bot.controller.handle(text("2", "Dilnoza")).await;
    for answer in ["Ali", "+998901234567", "Bukhara"] {
        bot.controller.handle(text("2", answer)).await;
    }
    bot.controller.handle(button("2", BTN_CADASTR_YES)).await;
    bot.controller.handle(button("2", BTN_TRANSFORMER_YES)).await;
    bot.controller.handle(text("2", "630")).await;
    bot.controller.handle(text("2", "120")).await;
    let turn = bot.controller.handle(button("2", "station_80kwt")).await;
    assert_eq!(turn.outcome, TurnOutcome::Advanced(Stage::Location));
    bot.controller.handle(location("2")).await;
    let turn = bot.controller.handle(text("2", "behind the school")).await;
    assert_eq!(turn.outcome, TurnOutcome::Advanced(Stage::MediaUpload));
    bot.controller.handle(button("2", BTN_FINISH)).await;

    let rows = bot.records.rows().await;
    let row = &rows[0];
    assert_eq!(row[MANAGER], "Dilnoza");
    assert_eq!(row[PHONE], "+998901234567");
    assert_eq!(row[CADASTR], prompts::YES_VALUE);
    assert_eq!(row[TRANSFORMER], prompts::YES_VALUE);
    assert_eq!(row[TRANSFORMER_POWER], "630");
    assert_eq!(row[FREE_POWER], "120");
    assert_eq!(row[STATION], "80кВт");
    assert_eq!(row[LOCATION_INFO], "behind the school");
}

// =============================================================================
// Attachments
// =============================================================================

#[tokio::test]
async fn uploads_share_one_folder_per_session() {
    let bot = bot(multi_upload());
    bot.gateway.add_file(FileRef::new("p1"), b"jpeg".to_vec()).await;
    bot.gateway.add_file(FileRef::new("v1"), b"mp4".to_vec()).await;

    bot.controller.handle(start("3")).await;
    answer_basics_without_transformer(&bot, "3").await;
    bot.controller.handle(location("3")).await;

    let photo = bot.controller.handle(media("3", MediaKind::Photo, "p1")).await;
    assert!(matches!(photo.outcome, TurnOutcome::AttachmentStored(_)));
    let video = bot.controller.handle(media("3", MediaKind::Video, "v1")).await;
    assert!(matches!(video.outcome, TurnOutcome::AttachmentStored(_)));

    let folders = bot.attachments.folders().await;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].parent_id, "shared-folder");
    assert!(folders[0].name.starts_with("Request_3_"));

    let uploads = bot.attachments.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.folder_id == folders[0].folder.id));
    assert_eq!(uploads[0].mime_type, "image/jpeg");
    assert_eq!(uploads[1].mime_type, "video/mp4");

    bot.controller.handle(button("3", BTN_FINISH)).await;
    let rows = bot.records.rows().await;
    let row = &rows[0];
    assert_eq!(row[MEDIA], folders[0].folder.link);
}

#[tokio::test]
async fn failed_upload_keeps_earlier_attachments_and_allows_finish() {
    let bot = bot(multi_upload());
    bot.gateway.add_file(FileRef::new("p1"), b"first".to_vec()).await;
    bot.gateway.add_file(FileRef::new("p2"), b"second".to_vec()).await;

    bot.controller.handle(start("4")).await;
    answer_basics_without_transformer(&bot, "4").await;
    bot.controller.handle(location("4")).await;
    bot.controller.handle(media("4", MediaKind::Photo, "p1")).await;

    bot.attachments.set_fail_uploads(true);
    let turn = bot.controller.handle(media("4", MediaKind::Photo, "p2")).await;
    assert!(matches!(
        turn.outcome,
        TurnOutcome::AttachmentFailed(FormError::UploadFailed(_))
    ));
    assert_eq!(turn.reply.unwrap().button_ids(), vec![BTN_FINISH]);
    assert_eq!(stage_of(&bot, "4").await, Some(Stage::MediaUpload));
    let conversation = bot.controller.conversation(&user("4")).await;
    assert_eq!(conversation.session().unwrap().attachments().len(), 1);

    let turn = bot.controller.handle(button("4", BTN_FINISH)).await;
    assert!(matches!(turn.outcome, TurnOutcome::Finalized(_)));
    let rows = bot.records.rows().await;
    let row = &rows[0];
    assert!(row[MEDIA].starts_with("memory://folders/"));
}

#[tokio::test]
async fn folder_failure_falls_back_to_shared_folder() {
    let bot = bot(multi_upload());
    bot.gateway.add_file(FileRef::new("p1"), b"a".to_vec()).await;
    bot.gateway.add_file(FileRef::new("p2"), b"b".to_vec()).await;
    bot.attachments.set_fail_folders(true);

    bot.controller.handle(start("5")).await;
    answer_basics_without_transformer(&bot, "5").await;
    bot.controller.handle(location("5")).await;
    bot.controller.handle(media("5", MediaKind::Photo, "p1")).await;
    bot.controller.handle(media("5", MediaKind::Photo, "p2")).await;
    bot.controller.handle(button("5", BTN_FINISH)).await;

    let uploads = bot.attachments.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.folder_id == "shared-folder"));

    let rows = bot.records.rows().await;
    let row = &rows[0];
    assert_eq!(row[MEDIA], format!("{}\n{}", uploads[0].url, uploads[1].url));
}

#[tokio::test]
async fn missing_download_is_an_upload_failure() {
    let bot = bot(FlowCapabilities::minimal());
    bot.controller.handle(start("6")).await;
    answer_basics_without_transformer(&bot, "6").await;
    bot.controller.handle(location("6")).await;

    let turn = bot.controller.handle(media("6", MediaKind::Photo, "gone")).await;
    assert!(matches!(turn.outcome, TurnOutcome::AttachmentFailed(_)));
    assert!(bot.attachments.uploads().await.is_empty());
    assert_eq!(stage_of(&bot, "6").await, Some(Stage::MediaUpload));
}

// =============================================================================
// Finalization
// =============================================================================

#[tokio::test]
async fn operators_receive_summary_even_if_one_is_unreachable() {
    let bot = bot(FlowCapabilities::minimal());
    bot.gateway.set_unreachable(operator(1)).await;

    bot.controller.handle(start("7")).await;
    answer_basics_without_transformer(&bot, "7").await;
    bot.controller.handle(location("7")).await;
    let turn = bot.controller.handle(button("7", BTN_FINISH)).await;

    assert!(matches!(turn.outcome, TurnOutcome::Finalized(_)));
    assert_eq!(bot.records.row_count().await, 1);
    assert!(bot.gateway.sent_to(&operator(1)).await.is_empty());

    let delivered = bot.gateway.sent_to(&operator(2)).await;
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].text.contains("Ali"));
    assert!(delivered[0].text.contains("Samarkand"));
    assert!(bot.controller.conversation(&user("7")).await.is_idle());
}

#[tokio::test]
async fn store_outage_does_not_finalize_or_notify() {
    let bot = bot(FlowCapabilities::minimal());
    bot.controller.handle(start("8")).await;
    answer_basics_without_transformer(&bot, "8").await;
    bot.controller.handle(location("8")).await;

    bot.records.set_unavailable(true);
    let turn = bot.controller.handle(button("8", BTN_FINISH)).await;

    assert!(matches!(
        turn.outcome,
        TurnOutcome::NotFinalized(FormError::StoreUnavailable(_))
    ));
    assert_eq!(bot.records.row_count().await, 0);
    assert!(bot.gateway.sent_to(&operator(1)).await.is_empty());
    assert!(bot.gateway.sent_to(&operator(2)).await.is_empty());
    assert_eq!(stage_of(&bot, "8").await, Some(Stage::MediaUpload));
}

// =============================================================================
// Cancel, restart and the manager directory
// =============================================================================

#[tokio::test]
async fn cancel_discards_fields_and_restart_restores_manager() {
    let bot = bot(FlowCapabilities::default());
    bot.controller.handle(start("9")).await;
    bot.controller.handle(text("9", "Dilnoza")).await;
    bot.controller.handle(text("9", "Ali")).await;
    bot.controller.handle(text("9", "901234567")).await;

    let turn = bot
        .controller
        .handle(InboundEvent::new(user("9"), EventPayload::Command(Command::Cancel)))
        .await;
    assert_eq!(turn.outcome, TurnOutcome::Cancelled);
    assert!(bot.controller.conversation(&user("9")).await.is_idle());

    let turn = bot.controller.handle(start("9")).await;
    assert_eq!(turn.outcome, TurnOutcome::Started(Stage::ContactName));

    let conversation = bot.controller.conversation(&user("9")).await;
    let session = conversation.session().unwrap();
    assert_eq!(session.fields().len(), 1);
    assert_eq!(session.manager_name().as_deref(), Some("Dilnoza"));
    assert!(!session.fields().contains(FieldKey::ContactName));
}

fn command(id: &str, command: Command) -> InboundEvent {
    InboundEvent::new(user(id), EventPayload::Command(command))
}

/// One answer per stage of the full form up to the media upload.
fn full_form_answers(id: &str) -> Vec<(Stage, InboundEvent)> {
    vec![
        (Stage::ManagerName, text(id, "Dilnoza")),
        (Stage::ContactName, text(id, "Ali")),
        (Stage::Phone, text(id, "+998901234567")),
        (Stage::Address, text(id, "Bukhara")),
        (Stage::CadastrNumber, button(id, BTN_CADASTR_YES)),
        (Stage::HasTransformer, button(id, BTN_TRANSFORMER_YES)),
        (Stage::TransformerPower, text(id, "630")),
        (Stage::FreePower, text(id, "120")),
        (Stage::Station, button(id, "station_80kwt")),
        (Stage::Location, location(id)),
        (Stage::LocationInfo, text(id, "behind the school")),
    ]
}

#[tokio::test]
async fn cancel_from_every_stage_discards_the_form() {
    for (answered, target) in Stage::ALL.into_iter().enumerate() {
        let id = format!("c{}", answered);
        let bot = bot(FlowCapabilities::default());
        bot.gateway.add_file(FileRef::new("p1"), b"jpeg".to_vec()).await;

        bot.controller.handle(start(&id)).await;
        for (expected, event) in full_form_answers(&id).into_iter().take(answered) {
            assert_eq!(stage_of(&bot, &id).await, Some(expected));
            bot.controller.handle(event).await;
        }
        assert_eq!(stage_of(&bot, &id).await, Some(target));
        if target == Stage::MediaUpload {
            let turn = bot.controller.handle(media(&id, MediaKind::Photo, "p1")).await;
            assert!(matches!(turn.outcome, TurnOutcome::AttachmentStored(_)));
        }

        let turn = bot.controller.handle(command(&id, Command::Cancel)).await;
        assert_eq!(turn.outcome, TurnOutcome::Cancelled, "cancel at {:?}", target);
        assert!(bot.controller.conversation(&user(&id)).await.is_idle());
        assert_eq!(bot.records.row_count().await, 0);
        assert!(bot.gateway.sent_to(&operator(1)).await.is_empty());

        // a fresh form keeps nothing but the remembered manager
        let turn = bot.controller.handle(start(&id)).await;
        let conversation = bot.controller.conversation(&user(&id)).await;
        let session = conversation.session().unwrap();
        assert!(session.attachments().is_empty());
        if target == Stage::ManagerName {
            assert_eq!(turn.outcome, TurnOutcome::Started(Stage::ManagerName));
            assert!(session.fields().is_empty());
        } else {
            assert_eq!(turn.outcome, TurnOutcome::Started(Stage::ContactName));
            assert_eq!(session.fields().len(), 1);
            assert!(session.fields().contains(FieldKey::ManagerName));
        }
    }
}

#[tokio::test]
async fn cancel_while_changing_manager_keeps_the_old_name() {
    let directory = Arc::new(InMemoryManagerDirectory::new());
    let bot = bot_with(
        FlowCapabilities::default(),
        directory.clone(),
        vec![operator(1)],
    );
    directory.set(&user("13"), "Dilnoza").await.unwrap();

    let turn = bot.controller.handle(command("13", Command::ChangeManager)).await;
    assert_eq!(turn.outcome, TurnOutcome::AwaitingManager);

    let turn = bot.controller.handle(command("13", Command::Cancel)).await;
    assert_eq!(turn.outcome, TurnOutcome::Cancelled);
    assert!(bot.controller.conversation(&user("13")).await.is_idle());

    // the next text is no longer taken as a manager name
    let turn = bot.controller.handle(text("13", "Sardor")).await;
    assert_eq!(turn.outcome, TurnOutcome::Idle);
    assert_eq!(directory.get(&user("13")).await.unwrap().as_deref(), Some("Dilnoza"));
}

#[tokio::test]
async fn manager_name_survives_a_restart_through_the_json_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");

    let first = bot_with(
        FlowCapabilities::default(),
        Arc::new(JsonFileManagerDirectory::new(&path)),
        vec![operator(1)],
    );
    first.controller.handle(start("10")).await;
    first.controller.handle(text("10", "Sardor")).await;
    drop(first);

    let second = bot_with(
        FlowCapabilities::default(),
        Arc::new(JsonFileManagerDirectory::new(&path)),
        vec![operator(1)],
    );
    let turn = second.controller.handle(start("10")).await;
    assert_eq!(turn.outcome, TurnOutcome::Started(Stage::ContactName));
    assert!(turn.reply.unwrap().text.contains("Sardor"));
}

#[tokio::test]
async fn users_do_not_share_sessions() {
    let bot = bot(FlowCapabilities::minimal());
    bot.controller.handle(start("11")).await;
    bot.controller.handle(start("12")).await;
    bot.controller.handle(text("11", "Ali")).await;

    assert_eq!(stage_of(&bot, "11").await, Some(Stage::Phone));
    assert_eq!(stage_of(&bot, "12").await, Some(Stage::ContactName));
    assert_eq!(bot.controller.active_conversations().await, 2);
}

// =============================================================================
// Dispatcher
// =============================================================================

#[tokio::test]
async fn dispatcher_completes_forms_for_concurrent_users() {
    let bot = bot(FlowCapabilities::minimal());
    let dispatcher = Dispatcher::new(
        bot.controller.clone(),
        Arc::new(bot.gateway.clone()),
        DispatcherSettings::default(),
    );

    for id in ["21", "22", "23"] {
        dispatcher.dispatch(start(id)).await;
    }
    for id in ["21", "22", "23"] {
        for answer in ["Ali", "901234567", "Samarkand"] {
            dispatcher.dispatch(text(id, answer)).await;
        }
        dispatcher.dispatch(button(id, BTN_CADASTR_NO)).await;
        dispatcher.dispatch(button(id, BTN_TRANSFORMER_NO)).await;
        dispatcher.dispatch(location(id)).await;
        dispatcher.dispatch(button(id, BTN_FINISH)).await;
    }
    dispatcher.shutdown().await;

    assert_eq!(bot.records.row_count().await, 3);
    for id in ["21", "22", "23"] {
        // start, five answers, location, finish
        assert_eq!(bot.gateway.sent_to(&user(id)).await.len(), 8);
        assert!(bot.controller.conversation(&user(id)).await.is_idle());
    }
    assert_eq!(bot.gateway.sent_to(&operator(2)).await.len(), 3);
}
