use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::domain::{
    Account, AccountId, AccountStatus, EntryId, EntryKind, EntryStatus, InboxNotification,
    LedgerEntry, Notification, NotificationId, Payment, PaymentId, Transfer, TransferId, Wallet,
    WalletId,
};

use super::entries::TransactionAggregate;
use super::{AtomicUnit, MIGRATION_001_INITIAL, accounts, entries, notifications, wallets};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for persisting and querying the ledger.
///
/// Reads go straight to the pool. Anything that mutates more than one record
/// goes through an [`AtomicUnit`] obtained from [`Repository::begin`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_timeout(database_url, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Connect with an explicit busy timeout: how long a writer waits for
    /// the database lock before giving up.
    pub async fn connect_with_timeout(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open an atomic unit.
    pub async fn begin(&self) -> Result<AtomicUnit> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin atomic unit")?;
        Ok(AtomicUnit::new(tx))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Accounts & wallets
    // ========================

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        accounts::by_id(&self.pool, id).await
    }

    pub async fn set_account_status(&self, id: AccountId, status: AccountStatus) -> Result<bool> {
        accounts::set_status(&self.pool, id, status).await
    }

    pub async fn get_wallet_by_account(&self, account_id: AccountId) -> Result<Option<Wallet>> {
        wallets::by_account(&self.pool, account_id).await
    }

    pub async fn set_wallet_active(&self, wallet_id: WalletId, active: bool) -> Result<bool> {
        wallets::set_active(&self.pool, wallet_id, active).await
    }

    // ========================
    // Transactions
    // ========================

    pub async fn get_transaction(&self, id: EntryId) -> Result<Option<LedgerEntry>> {
        entries::transaction_by_id(&self.pool, id).await
    }

    pub async fn list_transactions_filtered(
        &self,
        account_id: Option<AccountId>,
        kind: Option<EntryKind>,
        status: Option<EntryStatus>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>> {
        entries::list_transactions(&self.pool, account_id, kind, status, from_date, to_date).await
    }

    pub async fn aggregate_transactions(
        &self,
        account_id: Option<AccountId>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<TransactionAggregate> {
        entries::aggregate_transactions(&self.pool, account_id, from_date, to_date).await
    }

    // ========================
    // Transfers
    // ========================

    pub async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>> {
        entries::transfer_by_id(&self.pool, id).await
    }

    pub async fn list_transfers_for_account(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        entries::transfers_for_account(&self.pool, account_id, limit, offset).await
    }

    pub async fn count_transfers_for_account(&self, account_id: AccountId) -> Result<i64> {
        entries::count_transfers_for_account(&self.pool, account_id).await
    }

    // ========================
    // Payments
    // ========================

    pub async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        entries::payment_by_id(&self.pool, id).await
    }

    pub async fn list_payments_for_account(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>> {
        entries::payments_for_account(&self.pool, account_id, limit, offset).await
    }

    pub async fn count_payments_for_account(&self, account_id: AccountId) -> Result<i64> {
        entries::count_payments_for_account(&self.pool, account_id).await
    }

    // ========================
    // Notifications
    // ========================

    pub async fn save_notification(&self, notification: &Notification) -> Result<InboxNotification> {
        notifications::insert(&self.pool, notification).await
    }

    pub async fn list_notifications(
        &self,
        account_id: AccountId,
        unread_only: bool,
    ) -> Result<Vec<InboxNotification>> {
        notifications::for_account(&self.pool, account_id, unread_only).await
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<bool> {
        notifications::mark_read(&self.pool, id).await
    }

    pub async fn mark_all_notifications_read(&self, account_id: AccountId) -> Result<u64> {
        notifications::mark_all_read(&self.pool, account_id).await
    }

    pub async fn delete_notification(&self, id: NotificationId) -> Result<bool> {
        notifications::delete(&self.pool, id).await
    }

    pub async fn delete_read_notifications(&self, account_id: AccountId) -> Result<u64> {
        notifications::delete_read(&self.pool, account_id).await
    }
}
