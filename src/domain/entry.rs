use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, MinorUnits, WalletId};

pub type EntryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    Deposit,
    Withdraw,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "DEPOSIT",
            EntryKind::Withdraw => "WITHDRAW",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(EntryKind::Deposit),
            "WITHDRAW" => Some(EntryKind::Withdraw),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "Deposit",
            EntryKind::Withdraw => "Withdrawal",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// SUCCESS -> FAILED is the only transition; FAILED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Success,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Success => "SUCCESS",
            EntryStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Some(EntryStatus::Success),
            "FAILED" => Some(EntryStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deposit or withdrawal executed by an agent on an account's wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub amount: MinorUnits,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub wallet_id: WalletId,
    pub account_id: AccountId,
    pub agent_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub cancel_reason: Option<String>,
}

impl LedgerEntry {
    /// Signed effect this entry had on the wallet balance.
    pub fn balance_delta(&self) -> MinorUnits {
        match self.kind {
            EntryKind::Deposit => self.amount,
            EntryKind::Withdraw => -self.amount,
        }
    }

    /// Delta that undoes this entry.
    pub fn reversal_delta(&self) -> MinorUnits {
        -self.balance_delta()
    }

    pub fn is_cancellable(&self) -> bool {
        self.status != EntryStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, status: EntryStatus) -> LedgerEntry {
        LedgerEntry {
            id: 1,
            amount: 500,
            kind,
            status,
            wallet_id: 1,
            account_id: 1,
            agent_id: 2,
            created_at: Utc::now(),
            cancel_reason: None,
        }
    }

    #[test]
    fn test_reversal_delta() {
        assert_eq!(entry(EntryKind::Deposit, EntryStatus::Success).reversal_delta(), -500);
        assert_eq!(entry(EntryKind::Withdraw, EntryStatus::Success).reversal_delta(), 500);
    }

    #[test]
    fn test_failed_is_terminal() {
        assert!(entry(EntryKind::Deposit, EntryStatus::Success).is_cancellable());
        assert!(!entry(EntryKind::Deposit, EntryStatus::Failed).is_cancellable());
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [EntryKind::Deposit, EntryKind::Withdraw] {
            assert_eq!(EntryKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_str("refund"), None);
    }
}
