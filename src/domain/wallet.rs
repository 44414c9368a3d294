use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, MinorUnits};

pub type WalletId = i64;

pub const DEFAULT_CURRENCY: &str = "XOF";

/// The balance record owned by a single account.
/// `balance` never goes below zero after a committed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: WalletId,
    pub account_id: AccountId,
    pub balance: MinorUnits,
    pub currency: String,
    /// Informational limit set by the account holder; not enforced by the ledger.
    pub spending_cap: Option<MinorUnits>,
    /// Activation gate, independent of the account status. Required for payments.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn can_cover(&self, amount: MinorUnits) -> bool {
        self.balance >= amount
    }
}
