//! Dispatcher - one logical worker per user.
//!
//! Inbound events are queued per user and handled strictly in arrival order
//! by that user's worker; workers for different users run concurrently. A
//! worker with an empty queue retires after `idle_timeout`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::form_controller::FormController;
use crate::domain::form::InboundEvent;
use crate::domain::foundation::UserId;
use crate::ports::MessagingGateway;

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Events buffered per user before `dispatch` waits.
    pub queue_depth: usize,
    /// How long a worker waits for the next event before retiring.
    pub idle_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            queue_depth: 32,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

struct Worker {
    sender: mpsc::Sender<InboundEvent>,
    task: JoinHandle<()>,
}

type Workers = Arc<Mutex<HashMap<UserId, Worker>>>;

/// Routes events to per-user workers and sends their replies.
pub struct Dispatcher {
    controller: Arc<FormController>,
    gateway: Arc<dyn MessagingGateway>,
    workers: Workers,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        controller: Arc<FormController>,
        gateway: Arc<dyn MessagingGateway>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            controller,
            gateway,
            workers: Arc::new(Mutex::new(HashMap::new())),
            settings,
        }
    }

    /// Queues `event` for its user, starting a worker if none is running.
    pub async fn dispatch(&self, event: InboundEvent) {
        let mut event = event;
        loop {
            let sender = {
                let mut workers = self.workers.lock().await;
                let worker = workers
                    .entry(event.user_id.clone())
                    .or_insert_with(|| self.spawn_worker(event.user_id.clone()));
                match worker.sender.try_send(event) {
                    Ok(()) => return,
                    Err(mpsc::error::TrySendError::Full(returned)) => {
                        event = returned;
                        worker.sender.clone()
                    }
                    Err(mpsc::error::TrySendError::Closed(returned)) => {
                        // worker is retiring; replace it
                        event = returned;
                        workers.remove(&event.user_id);
                        continue;
                    }
                }
            };

            tracing::debug!(user_id = %event.user_id, "User queue full, waiting");
            match sender.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => event = returned,
            }
        }
    }

    /// Number of live workers.
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Stops accepting work and waits for queued events to be handled.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self
            .workers
            .lock()
            .await
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        tracing::info!(workers = workers.len(), "Dispatcher draining");
        for Worker { sender, task } in workers {
            drop(sender);
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Worker ended abnormally");
            }
        }
    }

    fn spawn_worker(&self, user_id: UserId) -> Worker {
        let (sender, receiver) = mpsc::channel(self.settings.queue_depth.max(1));
        tracing::debug!(user_id = %user_id, "Worker started");
        let task = tokio::spawn(run_worker(
            user_id,
            receiver,
            sender.clone(),
            self.controller.clone(),
            self.gateway.clone(),
            self.workers.clone(),
            self.settings.idle_timeout,
        ));
        Worker { sender, task }
    }
}

async fn run_worker(
    user_id: UserId,
    mut receiver: mpsc::Receiver<InboundEvent>,
    own_sender: mpsc::Sender<InboundEvent>,
    controller: Arc<FormController>,
    gateway: Arc<dyn MessagingGateway>,
    workers: Workers,
    idle_timeout: Duration,
) {
    // only the table entry may keep the channel open
    let own_channel = own_sender.downgrade();
    drop(own_sender);

    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(event)) => process(&controller, gateway.as_ref(), event).await,
            Ok(None) => break,
            Err(_) => {
                let mut table = workers.lock().await;
                match receiver.try_recv() {
                    Ok(event) => {
                        drop(table);
                        process(&controller, gateway.as_ref(), event).await;
                    }
                    Err(_) => {
                        let ours = match (table.get(&user_id), own_channel.upgrade()) {
                            (Some(worker), Some(own)) => worker.sender.same_channel(&own),
                            _ => false,
                        };
                        if ours {
                            table.remove(&user_id);
                        }
                        break;
                    }
                }
            }
        }
    }

    // anything that slipped in after retirement is still handled in order
    receiver.close();
    while let Some(event) = receiver.recv().await {
        process(&controller, gateway.as_ref(), event).await;
    }
    tracing::debug!(user_id = %user_id, "Worker retired");
}

async fn process(controller: &FormController, gateway: &dyn MessagingGateway, event: InboundEvent) {
    let user_id = event.user_id.clone();
    let kind = event.payload.kind();
    let turn = controller.handle(event).await;
    tracing::debug!(user_id = %user_id, event = %kind, outcome = ?turn.outcome, "Turn handled");

    if let Some(reply) = turn.reply {
        if let Err(e) = gateway.send(&user_id, &reply).await {
            tracing::warn!(user_id = %user_id, error = %e, "Reply not delivered");
        }
    }
}
