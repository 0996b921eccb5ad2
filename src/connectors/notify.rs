// src/connectors/notify.rs
use crate::connectors::traits::Notifier;
use crate::types::Notification;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Non-blocking handle the engine uses to emit notifications.
#[derive(Clone)]
pub struct NotificationSink {
    sender: mpsc::Sender<Notification>,
}

impl NotificationSink {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender }
    }

    pub fn send(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                warn!("Notification queue full, dropped: {}", n.message);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Notification channel closed! Notifier task is likely dead.");
            }
        }
    }
}

/// Drains the queue into `notifier`; failures are logged and dropped.
pub fn spawn_notifier(
    notifier: Arc<dyn Notifier>,
    mut receiver: mpsc::Receiver<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = receiver.recv().await {
            if let Err(e) = notifier.notify(&notification).await {
                warn!("Notification failed: {}", e);
            }
        }
    })
}

/// Closes the queue and waits until everything already queued was delivered.
pub async fn close_notifier(sink: NotificationSink, task: JoinHandle<()>) {
    drop(sink);
    if let Err(e) = task.await {
        error!("Notifier task ended abnormally: {}", e);
    }
}

/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!("[notify] {} {}", notification.kind.icon(), notification.message);
        Ok(())
    }
}
