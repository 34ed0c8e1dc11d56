//! power-intake - Telegram intake bot for power-connection requests.
//!
//! Reads configuration from `POWER_INTAKE__*` environment variables (and a
//! `.env` file when present), then long-polls the Bot API until Ctrl-C.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tokio::sync::watch;

use power_intake::adapters::google::{
    GoogleDriveAttachmentStore, GoogleSheetsRecordStore, ServiceAccountAuth, ServiceAccountKey,
    DRIVE_SCOPE, SHEETS_SCOPE,
};
use power_intake::adapters::{BotApiConfig, JsonFileManagerDirectory, TelegramClient, UpdatePoller};
use power_intake::application::{
    AttachmentRelay, Dispatcher, DispatcherSettings, FormController, RelaySettings,
};
use power_intake::config::{AppConfig, LoggingConfig};
use power_intake::domain::form::FormFlow;
use power_intake::ports::{AttachmentStore, ManagerDirectory, MessagingGateway, RecordStore};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging)?;

    run(config).await
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), BoxError> {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.env_filter()?);
    if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

async fn run(config: AppConfig) -> Result<(), BoxError> {
    let offset = config.form.offset()?;
    let operators = config.telegram.operator_ids()?;

    let telegram = Arc::new(TelegramClient::new(
        BotApiConfig::new(config.telegram.bot_token.expose_secret().clone())
            .with_api_base_url(config.telegram.api_base_url.clone()),
    )?);
    let gateway: Arc<dyn MessagingGateway> = telegram.clone();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let key = ServiceAccountKey::from_file(&config.google.credentials_file).await?;
    let auth = Arc::new(ServiceAccountAuth::new(key, &[SHEETS_SCOPE, DRIVE_SCOPE], http)?);
    tracing::info!(account = %auth.client_email(), "Google service account loaded");

    let records: Arc<dyn RecordStore> = Arc::new(GoogleSheetsRecordStore::new(
        auth.clone(),
        config.google.spreadsheet_id.clone(),
        config.google.sheet_name.clone(),
    ));
    let attachments: Arc<dyn AttachmentStore> = Arc::new(GoogleDriveAttachmentStore::new(auth));
    let directory: Arc<dyn ManagerDirectory> =
        Arc::new(JsonFileManagerDirectory::new(&config.form.directory_path));

    let staging_dir = config.form.staging_dir();
    tokio::fs::create_dir_all(&staging_dir).await?;

    let relay = AttachmentRelay::new(
        gateway.clone(),
        attachments,
        RelaySettings {
            default_folder_id: config.google.drive_folder_id.clone(),
            staging_dir,
            timeout: config.form.upload_timeout(),
        },
    );
    let controller = Arc::new(FormController::new(
        FormFlow::new(config.form.capabilities()),
        relay,
        records,
        directory,
        gateway.clone(),
        operators,
        offset,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        controller,
        gateway,
        DispatcherSettings::default(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = UpdatePoller::new(telegram, dispatcher.clone(), config.telegram.poll_timeout());
    let polling = tokio::spawn(async move { poller.run(shutdown_rx).await });

    tracing::info!(
        capabilities = ?config.form.capabilities(),
        utc_offset = %offset,
        "power-intake started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    if let Err(e) = polling.await {
        tracing::error!(error = %e, "Poll loop ended abnormally");
    }
    dispatcher.shutdown().await;
    tracing::info!("power-intake stopped");
    Ok(())
}
