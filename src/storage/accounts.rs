//! Account records. The ledger only needs existence, role and status.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::domain::{Account, AccountId, AccountStatus, Role};

use super::{from_db_time, to_db_time};

const ACCOUNT_COLUMNS: &str = "id, name, role, status, created_at";

/// Insert a new account and return it with its assigned id.
pub async fn insert<'e, E>(executor: E, name: &str, role: Role, status: AccountStatus) -> Result<Account>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        "INSERT INTO accounts (name, role, status, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(name)
        .bind(role.as_str())
        .bind(status.as_str())
        .bind(to_db_time(Utc::now()))
        .fetch_one(executor)
        .await
        .context("Failed to insert account")?;

    row_to_account(&row)
}

pub async fn by_id<'e, E>(executor: E, id: AccountId) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

/// Update the account status. Returns false if the account does not exist.
pub async fn set_status<'e, E>(executor: E, id: AccountId, status: AccountStatus) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE accounts SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to update account status")?;

    Ok(result.rows_affected() == 1)
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let role_str: String = row.get("role");
    let status_str: String = row.get("status");
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: row.get("id"),
        name: row.get("name"),
        role: Role::from_str(&role_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid account role: {}", role_str))?,
        status: AccountStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
        created_at: from_db_time(&created_at_str)?,
    })
}
