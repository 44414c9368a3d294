use super::{Amount, MinorUnits};

const BPS_DENOMINATOR: i64 = 10_000;

/// Transfer fee policy: a flat percentage of the transferred amount, expressed in basis points.
/// The fee is added on top of the amount when debiting the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub rate_bps: u32,
}

impl Default for FeePolicy {
    /// 0.5%
    fn default() -> Self {
        Self { rate_bps: 50 }
    }
}

impl FeePolicy {
    pub fn new(rate_bps: u32) -> Self {
        Self { rate_bps }
    }

    /// Fee for a transfer of `amount`, rounded half-up to the nearest minor unit.
    /// Saturates at `MinorUnits::MAX`.
    pub fn transfer_fee(&self, amount: Amount) -> MinorUnits {
        let scaled = amount.get() as i128 * self.rate_bps as i128;
        let denom = BPS_DENOMINATOR as i128;
        ((scaled + denom / 2) / denom).min(MinorUnits::MAX as i128) as MinorUnits
    }

    /// Total debited from the sender: amount plus fee.
    /// `None` when the sum does not fit in `MinorUnits`.
    pub fn total_debit(&self, amount: Amount) -> Option<MinorUnits> {
        amount.get().checked_add(self.transfer_fee(amount))
    }
}
