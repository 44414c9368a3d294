//! Post-commit notifications.
//!
//! The ledger hands each [`Notification`] to a [`Notifier`] once the money
//! movement is committed. Delivery happens elsewhere and can never undo or
//! fail the operation that produced it.

mod hub;

pub use hub::{LiveFeed, NotificationHub};

use tokio::sync::mpsc;

use crate::domain::Notification;

/// Sink for post-commit notifications. Implementations must not block and
/// must not report failure to the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Queues notifications for the [`NotificationHub`] dispatcher.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            tracing::warn!(
                account_id = err.0.account_id,
                "notification dispatcher stopped; dropping notification"
            );
        }
    }
}

/// Discards everything. Useful for one-shot CLI commands and tests.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(account_id = notification.account_id, "notification discarded");
    }
}
