use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;

pub type NotificationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Transaction,
    Transfer,
    Payment,
    Security,
    Urgent,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Transaction => "TRANSACTION",
            NotificationKind::Transfer => "TRANSFER",
            NotificationKind::Payment => "PAYMENT",
            NotificationKind::Security => "SECURITY",
            NotificationKind::Urgent => "URGENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRANSACTION" => Some(NotificationKind::Transaction),
            "TRANSFER" => Some(NotificationKind::Transfer),
            "PAYMENT" => Some(NotificationKind::Payment),
            "SECURITY" => Some(NotificationKind::Security),
            "URGENT" => Some(NotificationKind::Urgent),
            _ => None,
        }
    }

    /// Kinds that are also delivered by SMS.
    pub fn requires_sms(&self) -> bool {
        matches!(
            self,
            NotificationKind::Payment | NotificationKind::Security | NotificationKind::Urgent
        )
    }
}

/// A message for one account, produced by a ledger operation after it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub account_id: AccountId,
    pub content: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(account_id: AccountId, content: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            account_id,
            content: content.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}

/// A notification as stored in an account's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxNotification {
    pub id: NotificationId,
    pub account_id: AccountId,
    pub content: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
