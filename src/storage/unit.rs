use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use crate::domain::{
    Account, AccountId, AccountStatus, EntryId, EntryKind, LedgerEntry, MinorUnits, Payment,
    Role, Transfer, TransferId, Wallet, WalletId,
};

use super::{accounts, entries, wallets};

/// A group of store mutations that commit or roll back together.
///
/// Dropping a unit without calling [`AtomicUnit::commit`] rolls it back, so
/// any `?` between `begin` and `commit` leaves no partial state behind.
///
/// SQLite takes its write lock on the first write of a transaction. Callers
/// should make the first statement of a unit a write (a guarded balance
/// update or a guarded status flip) so that everything read afterwards is
/// read under that lock.
pub struct AtomicUnit {
    tx: Transaction<'static, Sqlite>,
}

impl AtomicUnit {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit atomic unit")
    }

    // ========================
    // Accounts
    // ========================

    pub async fn insert_account(
        &mut self,
        name: &str,
        role: Role,
        status: AccountStatus,
    ) -> Result<Account> {
        accounts::insert(&mut *self.tx, name, role, status).await
    }

    pub async fn account(&mut self, id: AccountId) -> Result<Option<Account>> {
        accounts::by_id(&mut *self.tx, id).await
    }

    // ========================
    // Wallets
    // ========================

    pub async fn insert_wallet(&mut self, account_id: AccountId, currency: &str) -> Result<Wallet> {
        wallets::insert(&mut *self.tx, account_id, currency).await
    }

    pub async fn wallet(&mut self, id: WalletId) -> Result<Option<Wallet>> {
        wallets::by_id(&mut *self.tx, id).await
    }

    /// See [`wallets::adjust_balance`]: `None` means the guard refused the delta.
    pub async fn adjust_balance(
        &mut self,
        wallet_id: WalletId,
        delta: MinorUnits,
    ) -> Result<Option<Wallet>> {
        wallets::adjust_balance(&mut *self.tx, wallet_id, delta).await
    }

    // ========================
    // Ledger records
    // ========================

    pub async fn record_transaction(
        &mut self,
        wallet_id: WalletId,
        account_id: AccountId,
        agent_id: AccountId,
        amount: MinorUnits,
        kind: EntryKind,
    ) -> Result<LedgerEntry> {
        entries::record_transaction(&mut *self.tx, wallet_id, account_id, agent_id, amount, kind)
            .await
    }

    pub async fn mark_transaction_failed(
        &mut self,
        id: EntryId,
        reason: Option<&str>,
    ) -> Result<Option<LedgerEntry>> {
        entries::mark_transaction_failed(&mut *self.tx, id, reason).await
    }

    pub async fn record_transfer(
        &mut self,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: MinorUnits,
        fee: MinorUnits,
    ) -> Result<Transfer> {
        entries::record_transfer(&mut *self.tx, sender_id, receiver_id, amount, fee).await
    }

    pub async fn mark_transfer_cancelled(
        &mut self,
        id: TransferId,
        at: DateTime<Utc>,
    ) -> Result<Option<Transfer>> {
        entries::mark_transfer_cancelled(&mut *self.tx, id, at).await
    }

    pub async fn record_payment(
        &mut self,
        account_id: AccountId,
        operator_id: AccountId,
        amount: MinorUnits,
    ) -> Result<Payment> {
        entries::record_payment(&mut *self.tx, account_id, operator_id, amount).await
    }
}
