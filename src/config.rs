//! Runtime configuration. Every setting can come from a flag, from a
//! `NUMMUS_*` environment variable or from a `.env` file.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::application::LedgerSettings;
use crate::domain::{AccountId, FeePolicy};

/// Basis points in 100%.
const MAX_FEE_BPS: u32 = 10_000;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Database file path
    #[arg(short, long, env = "NUMMUS_DATABASE", default_value = "nummus.db", global = true)]
    pub database: String,

    /// Transfer fee in basis points (50 = 0.5%)
    #[arg(long, env = "NUMMUS_FEE_BPS", default_value_t = 50, global = true)]
    pub fee_bps: u32,

    /// Minutes during which a transfer can still be cancelled
    #[arg(long, env = "NUMMUS_CANCEL_WINDOW_MINUTES", default_value_t = 30, global = true)]
    pub cancel_window_minutes: i64,

    /// Account whose wallet collects transfer fees
    #[arg(long, env = "NUMMUS_PLATFORM_ACCOUNT", global = true)]
    pub platform_account: Option<AccountId>,

    /// Currency for new wallets
    #[arg(long, env = "NUMMUS_CURRENCY", default_value = "XOF", global = true)]
    pub currency: String,

    /// How long a writer waits for the database lock, in milliseconds
    #[arg(long, env = "NUMMUS_BUSY_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub busy_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NUMMUS_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (pretty, json)
    #[arg(long, env = "NUMMUS_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.fee_bps > MAX_FEE_BPS {
            bail!("Fee rate {} bps exceeds 100%", self.fee_bps);
        }
        if self.cancel_window_minutes <= 0 {
            bail!("Cancellation window must be positive");
        }
        if self.currency.trim().len() != 3 {
            bail!("Invalid currency code: {}", self.currency);
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            bail!("Unknown log format: {}", self.log_format);
        }
        Ok(())
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn ledger(&self) -> LedgerSettings {
        LedgerSettings {
            fees: FeePolicy::new(self.fee_bps),
            cancellation_window: chrono::Duration::minutes(self.cancel_window_minutes),
            platform_account: self.platform_account,
            currency: self.currency.trim().to_uppercase(),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
/// Logs go to stderr so command output stays clean.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["nummus"]);
        let settings = cli.settings;
        assert!(settings.validate().is_ok());

        let ledger = settings.ledger();
        assert_eq!(ledger.fees.rate_bps, 50);
        assert_eq!(ledger.cancellation_window, chrono::Duration::minutes(30));
        assert_eq!(ledger.currency, "XOF");
    }

    #[test]
    fn test_overrides() {
        let cli = TestCli::parse_from([
            "nummus",
            "--fee-bps",
            "100",
            "--platform-account",
            "7",
            "--cancel-window-minutes",
            "10",
        ]);
        let ledger = cli.settings.ledger();
        assert_eq!(ledger.fees.rate_bps, 100);
        assert_eq!(ledger.platform_account, Some(7));
        assert_eq!(ledger.cancellation_window, chrono::Duration::minutes(10));
    }

    #[test]
    fn test_rejects_bad_values() {
        let cli = TestCli::parse_from(["nummus", "--fee-bps", "20000"]);
        assert!(cli.settings.validate().is_err());

        let cli = TestCli::parse_from(["nummus", "--cancel-window-minutes", "0"]);
        assert!(cli.settings.validate().is_err());
    }
}
