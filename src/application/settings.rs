use chrono::Duration;

use crate::domain::{
    AccountId, DEFAULT_CANCELLATION_WINDOW_MINUTES, DEFAULT_CURRENCY, FeePolicy,
};

/// Policy knobs for the ledger service.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub fees: FeePolicy,
    /// How long after creation a transfer may still be cancelled.
    pub cancellation_window: Duration,
    /// Account whose wallet collects transfer fees. Fees are still charged when unset.
    pub platform_account: Option<AccountId>,
    /// Currency for newly opened wallets.
    pub currency: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            fees: FeePolicy::default(),
            cancellation_window: Duration::minutes(DEFAULT_CANCELLATION_WINDOW_MINUTES),
            platform_account: None,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl LedgerSettings {
    pub fn with_platform_account(mut self, account_id: AccountId) -> Self {
        self.platform_account = Some(account_id);
        self
    }
}
