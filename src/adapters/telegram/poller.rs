//! Long-poll loop feeding updates into the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::client::TelegramClient;
use crate::application::Dispatcher;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Pulls updates with `getUpdates` until shutdown is signalled.
pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    poll_timeout: Duration,
}

impl UpdatePoller {
    pub fn new(client: Arc<TelegramClient>, dispatcher: Arc<Dispatcher>, poll_timeout: Duration) -> Self {
        Self {
            client,
            dispatcher,
            poll_timeout,
        }
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut offset = 0i64;
        let mut backoff = Duration::from_secs(1);
        tracing::info!(poll_timeout_secs = self.poll_timeout.as_secs(), "Polling for updates");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                polled = self.client.get_updates(offset, self.poll_timeout) => polled,
            };

            let updates = match polled {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    updates
                }
                Err(e) => {
                    tracing::warn!(error = %e, retry_in_secs = backoff.as_secs(), "getUpdates failed");
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(callback_id) = update.callback_id() {
                    if let Err(e) = self.client.answer_callback_query(callback_id).await {
                        tracing::debug!(error = %e, "Callback acknowledgement failed");
                    }
                }
                match update.to_event() {
                    Some(event) => self.dispatcher.dispatch(event).await,
                    None => tracing::debug!(update_id = update.update_id, "Update skipped"),
                }
            }
        }
        tracing::info!("Polling stopped");
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
