use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{
    Account, AccountId, EntryId, EntryKind, EntryStatus, InboxNotification, LedgerEntry,
    MinorUnits, NotificationId, Payment, PaymentId, Transfer, TransferId, Wallet,
};

use super::{AppError, LedgerService, PageRequest};

/// Filter for querying deposits and withdrawals.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub kind: Option<EntryKind>,
    pub status: Option<EntryStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub pages: i64,
    pub current_page: u32,
    pub limit: u32,
}

impl Pagination {
    fn new(total: i64, request: PageRequest) -> Self {
        let limit = request.limit as i64;
        Self {
            total,
            pages: (total + limit - 1) / limit,
            current_page: request.page,
            limit: request.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub count: i64,
    pub total: MinorUnits,
}

/// Counts and sums over deposits and withdrawals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub total_transactions: i64,
    pub deposits: KindStats,
    pub withdrawals: KindStats,
    pub successful_transactions: i64,
    pub failed_transactions: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletOverview {
    pub account: Account,
    pub wallet: Wallet,
}

/// Everything that moved through one account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatement {
    pub account: Account,
    pub wallet: Wallet,
    pub transactions: Vec<LedgerEntry>,
    pub transfers: Vec<Transfer>,
    pub payments: Vec<Payment>,
}

impl LedgerService {
    // ========================
    // Transactions
    // ========================

    pub async fn get_transaction(&self, id: EntryId) -> Result<LedgerEntry, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))
    }

    /// List deposits and withdrawals, newest first.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        check_range(filter.from_date, filter.to_date)?;
        Ok(self
            .repo
            .list_transactions_filtered(
                filter.account_id,
                filter.kind,
                filter.status,
                filter.from_date,
                filter.to_date,
            )
            .await?)
    }

    pub async fn transaction_stats(
        &self,
        account_id: Option<AccountId>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<TransactionStats, AppError> {
        check_range(from_date, to_date)?;
        let agg = self
            .repo
            .aggregate_transactions(account_id, from_date, to_date)
            .await?;

        Ok(TransactionStats {
            total_transactions: agg.total,
            deposits: KindStats {
                count: agg.deposit_count,
                total: agg.deposit_total,
            },
            withdrawals: KindStats {
                count: agg.withdrawal_count,
                total: agg.withdrawal_total,
            },
            successful_transactions: agg.successful,
            failed_transactions: agg.failed,
        })
    }

    // ========================
    // Transfers
    // ========================

    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.repo
            .get_transfer(id)
            .await?
            .ok_or(AppError::TransferNotFound(id))
    }

    /// Transfers an account sent or received, newest first.
    pub async fn transfer_history(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Transfer>, AppError> {
        self.get_account(account_id).await?;
        let total = self.repo.count_transfers_for_account(account_id).await?;
        let items = self
            .repo
            .list_transfers_for_account(account_id, request.limit as i64, request.offset())
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(total, request),
        })
    }

    // ========================
    // Payments
    // ========================

    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, AppError> {
        self.repo
            .get_payment(id)
            .await?
            .ok_or(AppError::PaymentNotFound(id))
    }

    pub async fn payment_history(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Payment>, AppError> {
        self.get_account(account_id).await?;
        let total = self.repo.count_payments_for_account(account_id).await?;
        let items = self
            .repo
            .list_payments_for_account(account_id, request.limit as i64, request.offset())
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(total, request),
        })
    }

    // ========================
    // Wallets & statements
    // ========================

    pub async fn wallet_overview(&self, account_id: AccountId) -> Result<WalletOverview, AppError> {
        let account = self.get_account(account_id).await?;
        let wallet = self.get_wallet(account_id).await?;
        Ok(WalletOverview { account, wallet })
    }

    pub async fn statement(&self, account_id: AccountId) -> Result<AccountStatement, AppError> {
        let WalletOverview { account, wallet } = self.wallet_overview(account_id).await?;
        let transactions = self
            .repo
            .list_transactions_filtered(Some(account_id), None, None, None, None)
            .await?;
        let transfer_count = self.repo.count_transfers_for_account(account_id).await?;
        let transfers = self
            .repo
            .list_transfers_for_account(account_id, transfer_count, 0)
            .await?;
        let payment_count = self.repo.count_payments_for_account(account_id).await?;
        let payments = self
            .repo
            .list_payments_for_account(account_id, payment_count, 0)
            .await?;

        Ok(AccountStatement {
            account,
            wallet,
            transactions,
            transfers,
            payments,
        })
    }

    // ========================
    // Notification inbox
    // ========================

    pub async fn notifications(
        &self,
        account_id: AccountId,
        unread_only: bool,
    ) -> Result<Vec<InboxNotification>, AppError> {
        Ok(self.repo.list_notifications(account_id, unread_only).await?)
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), AppError> {
        if !self.repo.mark_notification_read(id).await? {
            return Err(AppError::NotificationNotFound(id));
        }
        Ok(())
    }

    /// Returns how many notifications were flipped to read.
    pub async fn mark_all_notifications_read(&self, account_id: AccountId) -> Result<u64, AppError> {
        Ok(self.repo.mark_all_notifications_read(account_id).await?)
    }

    pub async fn delete_notification(&self, id: NotificationId) -> Result<(), AppError> {
        if !self.repo.delete_notification(id).await? {
            return Err(AppError::NotificationNotFound(id));
        }
        tracing::debug!(notification_id = id, "notification deleted");
        Ok(())
    }

    /// Clear the read part of an inbox. Unread notifications stay.
    pub async fn delete_read_notifications(&self, account_id: AccountId) -> Result<u64, AppError> {
        let deleted = self.repo.delete_read_notifications(account_id).await?;
        tracing::debug!(account_id, deleted, "read notifications deleted");
        Ok(deleted)
    }
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date. A bare date maps to
/// the start of that day, or to its last second when `end_of_day` is set.
pub fn parse_date(input: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "Invalid date '{}': expected YYYY-MM-DD or RFC 3339",
            input
        ))
    })?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid date '{}'", input)))
}

fn check_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<(), AppError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(AppError::Validation(
            "Start date must be before end date".to_string(),
        )),
        _ => Ok(()),
    }
}
