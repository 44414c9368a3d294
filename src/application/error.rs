use thiserror::Error;

use crate::domain::{
    AccountId, EntryId, InvalidAmount, MinorUnits, NotificationId, PaymentId, Role, TransferId,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("No wallet for account {0}")]
    WalletNotFound(AccountId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AccountId),

    #[error("Operator not found: {0}")]
    OperatorNotFound(AccountId),

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(EntryId),

    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Account {account_id} has role {role}; only {required} accounts can do this")]
    RoleNotAllowed {
        account_id: AccountId,
        role: Role,
        required: Role,
    },

    #[error("Wallet of account {0} is not active")]
    WalletInactive(AccountId),

    #[error("Account {0} is not active")]
    AccountInactive(AccountId),

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: MinorUnits,
        required: MinorUnits,
        /// Set when the required total includes a transfer fee.
        fee: Option<MinorUnits>,
    },

    #[error("Balance limit reached for account {account_id}: balance {balance}, credit {credit}")]
    BalanceLimit {
        account_id: AccountId,
        balance: MinorUnits,
        credit: MinorUnits,
    },

    #[error("Cancellation window of {window_minutes} minutes has expired for transfer {transfer_id}")]
    CancellationWindowExpired {
        transfer_id: TransferId,
        window_minutes: i64,
    },

    #[error("Transfer {0} cannot be cancelled")]
    NotCancellable(TransferId),

    #[error("Transaction {0} is already cancelled")]
    AlreadyCancelled(EntryId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Error categories exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    InsufficientFunds,
    Cancellation,
    Persistence,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidAmount(_)
            | AppError::Validation(_)
            | AppError::BalanceLimit { .. } => ErrorKind::Validation,

            AppError::AccountNotFound(_)
            | AppError::WalletNotFound(_)
            | AppError::AgentNotFound(_)
            | AppError::OperatorNotFound(_)
            | AppError::TransferNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::PaymentNotFound(_)
            | AppError::NotificationNotFound(_) => ErrorKind::NotFound,

            AppError::RoleNotAllowed { .. }
            | AppError::WalletInactive(_)
            | AppError::AccountInactive(_) => ErrorKind::Forbidden,

            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,

            AppError::CancellationWindowExpired { .. }
            | AppError::NotCancellable(_)
            | AppError::AlreadyCancelled(_) => ErrorKind::Cancellation,

            AppError::Database(_) => ErrorKind::Persistence,
        }
    }
}

impl From<InvalidAmount> for AppError {
    fn from(err: InvalidAmount) -> Self {
        AppError::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(AppError::AccountNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::WalletInactive(1).kind(), ErrorKind::Forbidden);
        assert_eq!(
            AppError::InsufficientFunds {
                account_id: 1,
                balance: 10,
                required: 20,
                fee: None
            }
            .kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            AppError::BalanceLimit {
                account_id: 1,
                balance: i64::MAX,
                credit: 1
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(AppError::AlreadyCancelled(3).kind(), ErrorKind::Cancellation);
        assert_eq!(
            AppError::Database(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_invalid_amount_conversion() {
        let err: AppError = InvalidAmount::NotPositive(0).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Invalid amount: amount must be positive, got 0");
    }
}
