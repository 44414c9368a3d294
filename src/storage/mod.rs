pub mod accounts;
pub mod entries;
pub mod notifications;
mod repository;
mod unit;
pub mod wallets;

pub use repository::*;
pub use unit::*;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}
