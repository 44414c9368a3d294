//! Notification inbox.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::domain::{AccountId, InboxNotification, Notification, NotificationId, NotificationKind};

use super::{from_db_time, to_db_time};

const NOTIFICATION_COLUMNS: &str = "id, account_id, content, kind, is_read, created_at";

pub async fn insert<'e, E>(executor: E, notification: &Notification) -> Result<InboxNotification>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        r#"
        INSERT INTO notifications (account_id, content, kind, is_read, created_at)
        VALUES (?, ?, ?, 0, ?)
        RETURNING {}
        "#,
        NOTIFICATION_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(notification.account_id)
        .bind(&notification.content)
        .bind(notification.kind.as_str())
        .bind(to_db_time(notification.created_at))
        .fetch_one(executor)
        .await
        .context("Failed to save notification")?;

    row_to_notification(&row)
}

/// Notifications for an account, newest first.
pub async fn for_account<'e, E>(
    executor: E,
    account_id: AccountId,
    unread_only: bool,
) -> Result<Vec<InboxNotification>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = format!(
        "SELECT {} FROM notifications WHERE account_id = ?",
        NOTIFICATION_COLUMNS
    );
    if unread_only {
        query.push_str(" AND is_read = 0");
    }
    query.push_str(" ORDER BY created_at DESC, id DESC");

    let rows = sqlx::query(&query)
        .bind(account_id)
        .fetch_all(executor)
        .await
        .context("Failed to list notifications")?;

    rows.iter().map(row_to_notification).collect()
}

/// Returns false if the notification does not exist.
pub async fn mark_read<'e, E>(executor: E, id: NotificationId) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to mark notification as read")?;

    Ok(result.rows_affected() == 1)
}

/// Returns the number of notifications that changed.
pub async fn mark_all_read<'e, E>(executor: E, account_id: AccountId) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE account_id = ? AND is_read = 0")
            .bind(account_id)
            .execute(executor)
            .await
            .context("Failed to mark notifications as read")?;

    Ok(result.rows_affected())
}

/// Returns false if the notification does not exist.
pub async fn delete<'e, E>(executor: E, id: NotificationId) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to delete notification")?;

    Ok(result.rows_affected() == 1)
}

/// Drop every read notification of an account. Returns how many went.
pub async fn delete_read<'e, E>(executor: E, account_id: AccountId) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM notifications WHERE account_id = ? AND is_read = 1")
        .bind(account_id)
        .execute(executor)
        .await
        .context("Failed to delete read notifications")?;

    Ok(result.rows_affected())
}

fn row_to_notification(row: &SqliteRow) -> Result<InboxNotification> {
    let kind_str: String = row.get("kind");
    let created_at_str: String = row.get("created_at");

    Ok(InboxNotification {
        id: row.get("id"),
        account_id: row.get("account_id"),
        content: row.get("content"),
        kind: NotificationKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid notification kind: {}", kind_str))?,
        is_read: row.get::<i32, _>("is_read") != 0,
        created_at: from_db_time(&created_at_str)?,
    })
}
