//! Ledger records: deposits/withdrawals, transfers and payments.
//! Pure persistence. Callers decide what is allowed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::domain::{
    AccountId, EntryId, EntryKind, EntryStatus, LedgerEntry, MinorUnits, Payment, PaymentId,
    PaymentStatus, Transfer, TransferId, TransferStatus, WalletId,
};

use super::{from_db_time, to_db_time};

const TRANSACTION_COLUMNS: &str =
    "id, amount, kind, status, wallet_id, account_id, agent_id, created_at, cancel_reason";

const TRANSFER_COLUMNS: &str =
    "id, amount, fee, status, sender_id, receiver_id, created_at, cancelled_at";

const PAYMENT_COLUMNS: &str = "id, amount, status, account_id, operator_id, created_at";

/// Aggregates over deposits and withdrawals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionAggregate {
    pub total: i64,
    pub deposit_count: i64,
    pub deposit_total: MinorUnits,
    pub withdrawal_count: i64,
    pub withdrawal_total: MinorUnits,
    pub successful: i64,
    pub failed: i64,
}

// ========================
// Transactions (deposits / withdrawals)
// ========================

pub async fn record_transaction<'e, E>(
    executor: E,
    wallet_id: WalletId,
    account_id: AccountId,
    agent_id: AccountId,
    amount: MinorUnits,
    kind: EntryKind,
) -> Result<LedgerEntry>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        INSERT INTO transactions (amount, kind, status, wallet_id, account_id, agent_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(amount)
        .bind(kind.as_str())
        .bind(EntryStatus::Success.as_str())
        .bind(wallet_id)
        .bind(account_id)
        .bind(agent_id)
        .bind(to_db_time(Utc::now()))
        .fetch_one(executor)
        .await
        .context("Failed to record transaction")?;

    row_to_transaction(&row)
}

pub async fn transaction_by_id<'e, E>(executor: E, id: EntryId) -> Result<Option<LedgerEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch transaction")?;

    row.as_ref().map(row_to_transaction).transpose()
}

/// SUCCESS -> FAILED, recording the reason if any. Returns the updated entry, or
/// `None` if the entry was not in SUCCESS (already failed or missing).
pub async fn mark_transaction_failed<'e, E>(
    executor: E,
    id: EntryId,
    reason: Option<&str>,
) -> Result<Option<LedgerEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        UPDATE transactions
        SET status = ?, cancel_reason = ?
        WHERE id = ? AND status = ?
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(EntryStatus::Failed.as_str())
        .bind(reason)
        .bind(id)
        .bind(EntryStatus::Success.as_str())
        .fetch_optional(executor)
        .await
        .context("Failed to update transaction status")?;

    row.as_ref().map(row_to_transaction).transpose()
}

/// List transactions with optional filters, newest first.
pub async fn list_transactions<'e, E>(
    executor: E,
    account_id: Option<AccountId>,
    kind: Option<EntryKind>,
    status: Option<EntryStatus>,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
) -> Result<Vec<LedgerEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = format!("SELECT {} FROM transactions WHERE 1=1", TRANSACTION_COLUMNS);

    let from_date_str = from_date.map(to_db_time);
    let to_date_str = to_date.map(to_db_time);

    if account_id.is_some() {
        query.push_str(" AND account_id = ?");
    }
    if kind.is_some() {
        query.push_str(" AND kind = ?");
    }
    if status.is_some() {
        query.push_str(" AND status = ?");
    }
    if from_date.is_some() {
        query.push_str(" AND created_at >= ?");
    }
    if to_date.is_some() {
        query.push_str(" AND created_at <= ?");
    }
    query.push_str(" ORDER BY created_at DESC, id DESC");

    let mut sql_query = sqlx::query(&query);
    if let Some(id) = account_id {
        sql_query = sql_query.bind(id);
    }
    if let Some(k) = kind {
        sql_query = sql_query.bind(k.as_str());
    }
    if let Some(s) = status {
        sql_query = sql_query.bind(s.as_str());
    }
    if let Some(ref fd) = from_date_str {
        sql_query = sql_query.bind(fd);
    }
    if let Some(ref td) = to_date_str {
        sql_query = sql_query.bind(td);
    }

    let rows = sql_query
        .fetch_all(executor)
        .await
        .context("Failed to list transactions")?;

    rows.iter().map(row_to_transaction).collect()
}

/// Count and sum deposits/withdrawals with optional filters.
pub async fn aggregate_transactions<'e, E>(
    executor: E,
    account_id: Option<AccountId>,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
) -> Result<TransactionAggregate>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = String::from(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN kind = 'DEPOSIT' THEN 1 ELSE 0 END), 0) AS deposit_count,
            COALESCE(SUM(CASE WHEN kind = 'DEPOSIT' THEN amount ELSE 0 END), 0) AS deposit_total,
            COALESCE(SUM(CASE WHEN kind = 'WITHDRAW' THEN 1 ELSE 0 END), 0) AS withdrawal_count,
            COALESCE(SUM(CASE WHEN kind = 'WITHDRAW' THEN amount ELSE 0 END), 0) AS withdrawal_total,
            COALESCE(SUM(CASE WHEN status = 'SUCCESS' THEN 1 ELSE 0 END), 0) AS successful,
            COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0) AS failed
        FROM transactions
        WHERE 1=1
        "#,
    );

    let from_date_str = from_date.map(to_db_time);
    let to_date_str = to_date.map(to_db_time);

    if account_id.is_some() {
        query.push_str(" AND account_id = ?");
    }
    if from_date.is_some() {
        query.push_str(" AND created_at >= ?");
    }
    if to_date.is_some() {
        query.push_str(" AND created_at <= ?");
    }

    let mut sql_query = sqlx::query(&query);
    if let Some(id) = account_id {
        sql_query = sql_query.bind(id);
    }
    if let Some(ref fd) = from_date_str {
        sql_query = sql_query.bind(fd);
    }
    if let Some(ref td) = to_date_str {
        sql_query = sql_query.bind(td);
    }

    let row = sql_query
        .fetch_one(executor)
        .await
        .context("Failed to aggregate transactions")?;

    Ok(TransactionAggregate {
        total: row.get("total"),
        deposit_count: row.get("deposit_count"),
        deposit_total: row.get("deposit_total"),
        withdrawal_count: row.get("withdrawal_count"),
        withdrawal_total: row.get("withdrawal_total"),
        successful: row.get("successful"),
        failed: row.get("failed"),
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<LedgerEntry> {
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");
    let created_at_str: String = row.get("created_at");

    Ok(LedgerEntry {
        id: row.get("id"),
        amount: row.get("amount"),
        kind: EntryKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
        status: EntryStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
        wallet_id: row.get("wallet_id"),
        account_id: row.get("account_id"),
        agent_id: row.get("agent_id"),
        created_at: from_db_time(&created_at_str)?,
        cancel_reason: row.get("cancel_reason"),
    })
}

// ========================
// Transfers
// ========================

pub async fn record_transfer<'e, E>(
    executor: E,
    sender_id: AccountId,
    receiver_id: AccountId,
    amount: MinorUnits,
    fee: MinorUnits,
) -> Result<Transfer>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        INSERT INTO transfers (amount, fee, status, sender_id, receiver_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        TRANSFER_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(amount)
        .bind(fee)
        .bind(TransferStatus::Completed.as_str())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(to_db_time(Utc::now()))
        .fetch_one(executor)
        .await
        .context("Failed to record transfer")?;

    row_to_transfer(&row)
}

pub async fn transfer_by_id<'e, E>(executor: E, id: TransferId) -> Result<Option<Transfer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM transfers WHERE id = ?", TRANSFER_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch transfer")?;

    row.as_ref().map(row_to_transfer).transpose()
}

/// COMPLETED -> CANCELLED. Returns the updated transfer, or `None` if it was
/// not COMPLETED (already cancelled or missing).
pub async fn mark_transfer_cancelled<'e, E>(
    executor: E,
    id: TransferId,
    at: DateTime<Utc>,
) -> Result<Option<Transfer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        UPDATE transfers
        SET status = ?, cancelled_at = ?
        WHERE id = ? AND status = ?
        RETURNING {}
        "#,
        TRANSFER_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(TransferStatus::Cancelled.as_str())
        .bind(to_db_time(at))
        .bind(id)
        .bind(TransferStatus::Completed.as_str())
        .fetch_optional(executor)
        .await
        .context("Failed to update transfer status")?;

    row.as_ref().map(row_to_transfer).transpose()
}

/// Transfers where the account is sender or receiver, newest first.
pub async fn transfers_for_account<'e, E>(
    executor: E,
    account_id: AccountId,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transfer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        SELECT {}
        FROM transfers
        WHERE sender_id = ? OR receiver_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        TRANSFER_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(account_id)
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .context("Failed to list transfers for account")?;

    rows.iter().map(row_to_transfer).collect()
}

pub async fn count_transfers_for_account<'e, E>(executor: E, account_id: AccountId) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM transfers WHERE sender_id = ? OR receiver_id = ?",
    )
    .bind(account_id)
    .bind(account_id)
    .fetch_one(executor)
    .await
    .context("Failed to count transfers")?;

    Ok(row.get("count"))
}

fn row_to_transfer(row: &SqliteRow) -> Result<Transfer> {
    let status_str: String = row.get("status");
    let created_at_str: String = row.get("created_at");
    let cancelled_at_str: Option<String> = row.get("cancelled_at");

    Ok(Transfer {
        id: row.get("id"),
        amount: row.get("amount"),
        fee: row.get("fee"),
        status: TransferStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transfer status: {}", status_str))?,
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        created_at: from_db_time(&created_at_str)?,
        cancelled_at: cancelled_at_str.as_deref().map(from_db_time).transpose()?,
    })
}

// ========================
// Payments
// ========================

pub async fn record_payment<'e, E>(
    executor: E,
    account_id: AccountId,
    operator_id: AccountId,
    amount: MinorUnits,
) -> Result<Payment>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        INSERT INTO payments (amount, status, account_id, operator_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        PAYMENT_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(amount)
        .bind(PaymentStatus::Success.as_str())
        .bind(account_id)
        .bind(operator_id)
        .bind(to_db_time(Utc::now()))
        .fetch_one(executor)
        .await
        .context("Failed to record payment")?;

    row_to_payment(&row)
}

pub async fn payment_by_id<'e, E>(executor: E, id: PaymentId) -> Result<Option<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch payment")?;

    row.as_ref().map(row_to_payment).transpose()
}

pub async fn payments_for_account<'e, E>(
    executor: E,
    account_id: AccountId,
    limit: i64,
    offset: i64,
) -> Result<Vec<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        SELECT {}
        FROM payments
        WHERE account_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        PAYMENT_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .context("Failed to list payments for account")?;

    rows.iter().map(row_to_payment).collect()
}

pub async fn count_payments_for_account<'e, E>(executor: E, account_id: AccountId) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS count FROM payments WHERE account_id = ?")
        .bind(account_id)
        .fetch_one(executor)
        .await
        .context("Failed to count payments")?;

    Ok(row.get("count"))
}

fn row_to_payment(row: &SqliteRow) -> Result<Payment> {
    let status_str: String = row.get("status");
    let created_at_str: String = row.get("created_at");

    Ok(Payment {
        id: row.get("id"),
        amount: row.get("amount"),
        status: PaymentStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid payment status: {}", status_str))?,
        account_id: row.get("account_id"),
        operator_id: row.get("operator_id"),
        created_at: from_db_time(&created_at_str)?,
    })
}
