use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, MinorUnits};

pub type TransferId = i64;

/// Default window during which a sender may cancel a completed transfer.
pub const DEFAULT_CANCELLATION_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "COMPLETED" => Some(TransferStatus::Completed),
            "CANCELLED" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A peer-to-peer movement of money. The sender paid `amount + fee`, the
/// receiver got `amount` and the platform account got `fee`.
/// Only `status` changes after creation, and only COMPLETED -> CANCELLED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub amount: MinorUnits,
    pub fee: MinorUnits,
    pub status: TransferStatus,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Amount that left the sender's wallet.
    pub fn total_debit(&self) -> MinorUnits {
        self.amount + self.fee
    }

    /// Returns true if `now` still falls inside the cancellation window.
    /// The boundary itself is inclusive.
    pub fn within_window(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.created_at <= window
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransferStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transfer(created_at: DateTime<Utc>) -> Transfer {
        Transfer {
            id: 1,
            amount: 200,
            fee: 1,
            status: TransferStatus::Completed,
            sender_id: 1,
            receiver_id: 2,
            created_at,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_total_debit_includes_fee() {
        assert_eq!(sample_transfer(Utc::now()).total_debit(), 201);
    }

    #[test]
    fn test_window_enforcement() {
        let created = Utc::now();
        let transfer = sample_transfer(created);
        let window = Duration::minutes(DEFAULT_CANCELLATION_WINDOW_MINUTES);

        assert!(transfer.within_window(created + Duration::minutes(29), window));
        assert!(transfer.within_window(created + Duration::minutes(30), window));
        assert!(!transfer.within_window(created + Duration::minutes(31), window));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [TransferStatus::Completed, TransferStatus::Cancelled] {
            assert_eq!(TransferStatus::from_str(status.as_str()), Some(status));
        }
    }
}
