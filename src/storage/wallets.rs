//! Wallet balances. Every balance change goes through [`adjust_balance`], which
//! refuses to take a balance below zero.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::domain::{AccountId, MinorUnits, Wallet, WalletId};

use super::{from_db_time, to_db_time};

const WALLET_COLUMNS: &str =
    "id, account_id, balance, currency, spending_cap, is_active, created_at, updated_at";

/// Create the wallet for an account: zero balance, inactive until activated.
pub async fn insert<'e, E>(executor: E, account_id: AccountId, currency: &str) -> Result<Wallet>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = to_db_time(Utc::now());
    let query = format!(
        r#"
        INSERT INTO wallets (account_id, balance, currency, spending_cap, is_active, created_at, updated_at)
        VALUES (?, 0, ?, NULL, 0, ?, ?)
        RETURNING {}
        "#,
        WALLET_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(account_id)
        .bind(currency)
        .bind(&now)
        .bind(&now)
        .fetch_one(executor)
        .await
        .context("Failed to insert wallet")?;

    row_to_wallet(&row)
}

pub async fn by_account<'e, E>(executor: E, account_id: AccountId) -> Result<Option<Wallet>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM wallets WHERE account_id = ?", WALLET_COLUMNS);
    let row = sqlx::query(&query)
        .bind(account_id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch wallet by account")?;

    row.as_ref().map(row_to_wallet).transpose()
}

pub async fn by_id<'e, E>(executor: E, id: WalletId) -> Result<Option<Wallet>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM wallets WHERE id = ?", WALLET_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch wallet")?;

    row.as_ref().map(row_to_wallet).transpose()
}

/// Apply `delta` (which may be negative) to the wallet balance.
///
/// The bounds check and the write happen in one statement, so the check
/// always sees the latest committed balance. Returns `None` when the result
/// would be negative, would exceed `i64::MAX`, or the wallet does not exist.
/// Nothing is written in that case.
pub async fn adjust_balance<'e, E>(
    executor: E,
    wallet_id: WalletId,
    delta: MinorUnits,
) -> Result<Option<Wallet>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        UPDATE wallets
        SET balance = balance + ?, updated_at = ?
        WHERE id = ?
          AND (? > 0 OR balance >= -?)
          AND (? <= 0 OR balance <= ? - ?)
        RETURNING {}
        "#,
        WALLET_COLUMNS
    );
    // Compared without adding, so SQLite never promotes the sum to REAL.
    let row = sqlx::query(&query)
        .bind(delta)
        .bind(to_db_time(Utc::now()))
        .bind(wallet_id)
        .bind(delta)
        .bind(delta)
        .bind(delta)
        .bind(MinorUnits::MAX)
        .bind(delta)
        .fetch_optional(executor)
        .await
        .context("Failed to adjust wallet balance")?;

    row.as_ref().map(row_to_wallet).transpose()
}

/// Flip the activation gate. Returns false if the wallet does not exist.
pub async fn set_active<'e, E>(executor: E, wallet_id: WalletId, active: bool) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE wallets SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(to_db_time(Utc::now()))
        .bind(wallet_id)
        .execute(executor)
        .await
        .context("Failed to update wallet activation")?;

    Ok(result.rows_affected() == 1)
}

fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(Wallet {
        id: row.get("id"),
        account_id: row.get("account_id"),
        balance: row.get("balance"),
        currency: row.get("currency"),
        spending_cap: row.get("spending_cap"),
        is_active: row.get::<i32, _>("is_active") != 0,
        created_at: from_db_time(&created_at_str)?,
        updated_at: from_db_time(&updated_at_str)?,
    })
}
