use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::domain::{AccountId, InboxNotification, Notification};
use crate::storage::Repository;

use super::{ChannelNotifier, Notifier};

const LIVE_CAPACITY: usize = 256;

/// Background dispatcher for notifications.
///
/// Every queued notification is saved to the inbox, flagged for SMS when its
/// kind asks for it, and pushed to live subscribers (WebSocket clients).
pub struct NotificationHub {
    notifier: Arc<ChannelNotifier>,
    live: broadcast::Sender<InboxNotification>,
    task: JoinHandle<()>,
}

impl NotificationHub {
    /// Spawn the dispatcher on the current tokio runtime.
    pub fn start(repo: Repository) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        let task = tokio::spawn(dispatch(repo, rx, live.clone()));

        Self {
            notifier: Arc::new(ChannelNotifier::new(tx)),
            live,
            task,
        }
    }

    /// Notifier to hand to the ledger service.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub fn feed(&self) -> LiveFeed {
        LiveFeed {
            live: self.live.clone(),
        }
    }

    /// Wait for every queued notification to be dispatched.
    ///
    /// The queue only drains once all notifiers are gone, so drop the ledger
    /// service (and anything else holding [`NotificationHub::notifier`]) first.
    pub async fn shutdown(self) {
        drop(self.notifier);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "notification dispatcher panicked");
        }
    }
}

/// Handle for subscribing to stored notifications as they arrive.
#[derive(Clone)]
pub struct LiveFeed {
    live: broadcast::Sender<InboxNotification>,
}

impl LiveFeed {
    pub fn subscribe(&self) -> broadcast::Receiver<InboxNotification> {
        self.live.subscribe()
    }
}

async fn dispatch(
    repo: Repository,
    mut rx: mpsc::UnboundedReceiver<Notification>,
    live: broadcast::Sender<InboxNotification>,
) {
    while let Some(notification) = rx.recv().await {
        let account_id = notification.account_id;
        if notification.kind.requires_sms() {
            request_sms(account_id, &notification.content);
        }

        match repo.save_notification(&notification).await {
            Ok(stored) => {
                // No subscribers is fine.
                let _ = live.send(stored);
            }
            Err(err) => {
                tracing::warn!(account_id, error = %err, "failed to store notification");
            }
        }
    }
    tracing::debug!("notification dispatcher stopped");
}

fn request_sms(account_id: AccountId, content: &str) {
    tracing::info!(account_id, content, "sms delivery requested");
}
