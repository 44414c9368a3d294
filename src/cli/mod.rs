use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::api::{self, AppState};
use crate::application::{
    CancelTransactionCommand, DepositCommand, LedgerService, PageRequest, PaymentCommand,
    TransactionFilter, TransferCommand, WithdrawCommand, parse_date,
};
use crate::config::Settings;
use crate::domain::{AccountStatus, EntryKind, EntryStatus, Role, format_amount, parse_amount};
use crate::notify::NotificationHub;
use crate::storage::Repository;

/// Nummus - mobile money ledger
#[derive(Parser)]
#[command(name = "nummus")]
#[command(about = "A mobile money ledger: wallets, cash in/out, transfers and merchant payments")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "NUMMUS_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Record a cash deposit made through an agent
    Deposit {
        /// Amount in minor units (e.g. "1500" or "1 500")
        amount: String,

        /// Account credited
        #[arg(long)]
        account: i64,

        /// Agent handling the cash
        #[arg(long)]
        agent: i64,
    },

    /// Record a cash withdrawal made through an agent
    Withdraw {
        /// Amount in minor units
        amount: String,

        /// Account debited
        #[arg(long)]
        account: i64,

        /// Agent handing out the cash
        #[arg(long)]
        agent: i64,
    },

    /// Send money to another account (the sender pays the fee)
    Transfer {
        /// Amount in minor units
        amount: String,

        /// Sender account
        #[arg(long)]
        from: i64,

        /// Receiver account
        #[arg(long)]
        to: i64,
    },

    /// Cancel a recent transfer
    CancelTransfer {
        /// Transfer ID
        id: i64,
    },

    /// Send a previous transfer again
    Resend {
        /// Transfer ID
        id: i64,
    },

    /// Cancel a deposit or withdrawal
    CancelTransaction {
        /// Transaction ID
        id: i64,

        /// Why the transaction is cancelled
        #[arg(long)]
        reason: Option<String>,
    },

    /// Pay a merchant operator
    Pay {
        /// Amount in minor units
        amount: String,

        /// Paying client account
        #[arg(long)]
        account: i64,

        /// Operator account
        #[arg(long)]
        operator: i64,
    },

    /// Show the transfer history of an account
    History {
        /// Account ID
        account: i64,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// List deposits and withdrawals
    Transactions {
        /// Filter by account
        #[arg(long)]
        account: Option<i64>,

        /// Filter by type (deposit, withdraw)
        #[arg(long = "type")]
        kind: Option<String>,

        /// Filter by status (success, failed)
        #[arg(long)]
        status: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Show aggregate statistics instead of the list
        #[arg(long)]
        stats: bool,
    },

    /// Show the payment history of an account
    Payments {
        /// Account ID
        account: i64,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Show the notification inbox of an account
    Notifications {
        /// Account ID
        account: i64,

        /// Only unread notifications
        #[arg(long)]
        unread: bool,

        /// Mark everything as read after listing
        #[arg(long)]
        mark_read: bool,

        /// Delete read notifications after listing
        #[arg(long)]
        purge_read: bool,
    },

    /// Export an account statement
    Export {
        /// Account ID
        account: i64,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (csv, json)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account with an empty wallet
    Create {
        /// Holder name
        name: String,

        /// Role (client, agent, operator, admin, superadmin)
        #[arg(long, default_value = "client")]
        role: String,

        /// Wallet currency (defaults to the configured currency)
        #[arg(long)]
        currency: Option<String>,

        /// Activate the wallet right away
        #[arg(long)]
        activate: bool,
    },

    /// Show account details
    Show {
        /// Account ID
        id: i64,
    },

    /// Change the account status
    Status {
        /// Account ID
        id: i64,

        /// New status (active, inactive)
        status: String,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Show the wallet of an account
    Show {
        /// Account ID
        account: i64,
    },

    /// Activate the wallet of an account
    Activate {
        /// Account ID
        account: i64,
    },

    /// Deactivate the wallet of an account
    Deactivate {
        /// Account ID
        account: i64,
    },
}

/// Ledger wired to a running notification dispatcher.
struct Runtime {
    repo: Repository,
    ledger: LedgerService,
    hub: NotificationHub,
}

impl Runtime {
    async fn open(settings: &Settings) -> Result<Self> {
        let repo = Repository::connect_with_timeout(&settings.database_url(), settings.busy_timeout())
            .await?;
        let hub = NotificationHub::start(repo.clone());
        let ledger = LedgerService::new(repo.clone(), hub.notifier(), settings.ledger());
        Ok(Self { repo, ledger, hub })
    }

    /// Flush pending notifications and close the pool.
    async fn close(self) {
        drop(self.ledger);
        self.hub.shutdown().await;
        self.repo.close().await;
    }
}

impl Cli {
    /// Log level after applying `--verbose`.
    pub fn log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.settings.log_level
        }
    }

    pub async fn run(self) -> Result<()> {
        self.settings.validate()?;

        match self.command {
            Commands::Init => {
                let repo = Repository::connect_with_timeout(
                    &self.settings.database_url(),
                    self.settings.busy_timeout(),
                )
                .await?;
                repo.migrate().await?;
                repo.close().await;
                println!("Initialized database: {}", self.settings.database);
            }

            Commands::Serve { bind } => run_serve(&self.settings, bind).await?,

            command => {
                let runtime = Runtime::open(&self.settings).await?;
                let result = run_command(&runtime.ledger, command).await;
                runtime.close().await;
                result?;
            }
        }

        Ok(())
    }
}

async fn run_serve(settings: &Settings, bind: SocketAddr) -> Result<()> {
    let repo =
        Repository::connect_with_timeout(&settings.database_url(), settings.busy_timeout()).await?;
    repo.migrate().await?;

    let ledger_settings = settings.ledger();
    if ledger_settings.platform_account.is_none() {
        tracing::warn!("no platform account configured; transfer fees will not be collected");
    }

    let hub = NotificationHub::start(repo.clone());
    let ledger = Arc::new(LedgerService::new(
        repo.clone(),
        hub.notifier(),
        ledger_settings,
    ));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %settings.database,
        fee_bps = settings.fee_bps,
        "starting nummus API"
    );
    let result = api::serve(AppState::new(ledger, hub.feed()), bind).await;

    hub.shutdown().await;
    repo.close().await;
    result
}

async fn run_command(service: &LedgerService, command: Commands) -> Result<()> {
    match command {
        Commands::Init | Commands::Serve { .. } => {
            anyhow::bail!("init and serve manage their own connection")
        }

        Commands::Account(cmd) => run_account_command(service, cmd).await?,

        Commands::Wallet(cmd) => run_wallet_command(service, cmd).await?,

        Commands::Deposit {
            amount,
            account,
            agent,
        } => {
            let result = service
                .deposit(DepositCommand {
                    account_id: account,
                    agent_id: agent,
                    amount: parse_amount(&amount)?,
                })
                .await?;
            println!(
                "Deposited {} {} to account {} (transaction {})",
                format_amount(result.entry.amount),
                result.wallet.currency,
                account,
                result.entry.id
            );
            println!(
                "New balance: {} {}",
                format_amount(result.wallet.balance),
                result.wallet.currency
            );
        }

        Commands::Withdraw {
            amount,
            account,
            agent,
        } => {
            let result = service
                .withdraw(WithdrawCommand {
                    account_id: account,
                    agent_id: agent,
                    amount: parse_amount(&amount)?,
                })
                .await?;
            println!(
                "Withdrew {} {} from account {} (transaction {})",
                format_amount(result.entry.amount),
                result.wallet.currency,
                account,
                result.entry.id
            );
            println!(
                "New balance: {} {}",
                format_amount(result.wallet.balance),
                result.wallet.currency
            );
        }

        Commands::Transfer { amount, from, to } => {
            let result = service
                .transfer(TransferCommand {
                    sender_id: from,
                    receiver_id: to,
                    amount: parse_amount(&amount)?,
                })
                .await?;
            print_transfer_result(&result);
        }

        Commands::CancelTransfer { id } => {
            let result = service.cancel_transfer(id).await?;
            println!(
                "Cancelled transfer {}: {} {} refunded to account {}",
                id,
                format_amount(result.refunded),
                result.sender_wallet.currency,
                result.transfer.sender_id
            );
        }

        Commands::Resend { id } => {
            let result = service.resend_transfer(id).await?;
            println!("Resent transfer {}", id);
            print_transfer_result(&result);
        }

        Commands::CancelTransaction { id, reason } => {
            let result = service
                .cancel_transaction(match reason {
                    Some(reason) => CancelTransactionCommand::new(id, reason),
                    None => CancelTransactionCommand::without_reason(id),
                })
                .await?;
            println!(
                "Cancelled {} {} ({} {})",
                result.entry.kind.label().to_lowercase(),
                id,
                format_amount(result.entry.amount),
                result.wallet.currency
            );
            println!(
                "New balance: {} {}",
                format_amount(result.wallet.balance),
                result.wallet.currency
            );
        }

        Commands::Pay {
            amount,
            account,
            operator,
        } => {
            let result = service
                .pay(PaymentCommand {
                    account_id: account,
                    operator_id: operator,
                    amount: parse_amount(&amount)?,
                })
                .await?;
            println!(
                "Paid {} {} to {} (payment {})",
                format_amount(result.payment.amount),
                result.wallet.currency,
                result.operator.name,
                result.payment.id
            );
            println!(
                "New balance: {} {}",
                format_amount(result.wallet.balance),
                result.wallet.currency
            );
        }

        Commands::History {
            account,
            page,
            limit,
        } => {
            let page = service
                .transfer_history(account, PageRequest::new(Some(page), Some(limit))?)
                .await?;
            if page.items.is_empty() {
                println!("No transfers found.");
            } else {
                println!(
                    "{:<6} {:<17} {:<10} {:>12} {:>8} {:<10}",
                    "ID", "DATE", "DIRECTION", "AMOUNT", "FEE", "STATUS"
                );
                println!("{}", "-".repeat(68));
                for t in &page.items {
                    let direction = if t.sender_id == account {
                        format!("-> {}", t.receiver_id)
                    } else {
                        format!("<- {}", t.sender_id)
                    };
                    println!(
                        "{:<6} {:<17} {:<10} {:>12} {:>8} {:<10}",
                        t.id,
                        t.created_at.format("%Y-%m-%d %H:%M"),
                        direction,
                        format_amount(t.amount),
                        format_amount(t.fee),
                        t.status
                    );
                }
            }
            println!(
                "Page {} of {} ({} transfers)",
                page.pagination.current_page,
                page.pagination.pages.max(1),
                page.pagination.total
            );
        }

        Commands::Transactions {
            account,
            kind,
            status,
            from,
            to,
            stats,
        } => {
            let filter = TransactionFilter {
                account_id: account,
                kind: kind
                    .as_deref()
                    .map(|k| {
                        EntryKind::from_str(k)
                            .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", k))
                    })
                    .transpose()?,
                status: status
                    .as_deref()
                    .map(|s| {
                        EntryStatus::from_str(s)
                            .ok_or_else(|| anyhow::anyhow!("Invalid status: {}", s))
                    })
                    .transpose()?,
                from_date: from.as_deref().map(|d| parse_date(d, false)).transpose()?,
                to_date: to.as_deref().map(|d| parse_date(d, true)).transpose()?,
            };

            if stats {
                let stats = service
                    .transaction_stats(filter.account_id, filter.from_date, filter.to_date)
                    .await?;
                println!("Transactions: {}", stats.total_transactions);
                println!(
                    "  Deposits:    {} ({})",
                    stats.deposits.count,
                    format_amount(stats.deposits.total)
                );
                println!(
                    "  Withdrawals: {} ({})",
                    stats.withdrawals.count,
                    format_amount(stats.withdrawals.total)
                );
                println!("  Successful:  {}", stats.successful_transactions);
                println!("  Cancelled:   {}", stats.failed_transactions);
            } else {
                let entries = service.list_transactions(&filter).await?;
                if entries.is_empty() {
                    println!("No transactions found.");
                } else {
                    println!(
                        "{:<6} {:<17} {:<9} {:>8} {:>12} {:<8} {}",
                        "ID", "DATE", "TYPE", "ACCOUNT", "AMOUNT", "STATUS", "REASON"
                    );
                    println!("{}", "-".repeat(80));
                    for e in &entries {
                        println!(
                            "{:<6} {:<17} {:<9} {:>8} {:>12} {:<8} {}",
                            e.id,
                            e.created_at.format("%Y-%m-%d %H:%M"),
                            e.kind,
                            e.account_id,
                            format_amount(e.amount),
                            e.status,
                            truncate(e.cancel_reason.as_deref().unwrap_or(""), 30)
                        );
                    }
                }
            }
        }

        Commands::Payments {
            account,
            page,
            limit,
        } => {
            let page = service
                .payment_history(account, PageRequest::new(Some(page), Some(limit))?)
                .await?;
            if page.items.is_empty() {
                println!("No payments found.");
            } else {
                println!(
                    "{:<6} {:<17} {:>9} {:>12} {:<8}",
                    "ID", "DATE", "OPERATOR", "AMOUNT", "STATUS"
                );
                println!("{}", "-".repeat(56));
                for p in &page.items {
                    println!(
                        "{:<6} {:<17} {:>9} {:>12} {:<8}",
                        p.id,
                        p.created_at.format("%Y-%m-%d %H:%M"),
                        p.operator_id,
                        format_amount(p.amount),
                        p.status.as_str()
                    );
                }
            }
            println!(
                "Page {} of {} ({} payments)",
                page.pagination.current_page,
                page.pagination.pages.max(1),
                page.pagination.total
            );
        }

        Commands::Notifications {
            account,
            unread,
            mark_read,
            purge_read,
        } => {
            let notifications = service.notifications(account, unread).await?;
            if notifications.is_empty() {
                println!("No notifications.");
            }
            for n in &notifications {
                println!(
                    "{} {:<17} [{}] {}",
                    if n.is_read { " " } else { "*" },
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.kind.as_str(),
                    n.content
                );
            }
            if mark_read {
                let count = service.mark_all_notifications_read(account).await?;
                println!("Marked {} notifications as read", count);
            }
            if purge_read {
                let count = service.delete_read_notifications(account).await?;
                println!("Deleted {} read notifications", count);
            }
        }

        Commands::Export {
            account,
            output,
            format,
        } => run_export_command(service, account, output.as_deref(), &format).await?,
    }

    Ok(())
}

fn print_transfer_result(result: &crate::application::TransferResult) {
    let currency = &result.sender_wallet.currency;
    println!(
        "Transferred {} {} from {} to {} (transfer {})",
        format_amount(result.transfer.amount),
        currency,
        result.sender.name,
        result.receiver.name,
        result.transfer.id
    );
    println!(
        "Fee: {} {}",
        format_amount(result.transfer.fee),
        currency
    );
    println!(
        "Sender balance: {} {}",
        format_amount(result.sender_wallet.balance),
        currency
    );
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            role,
            currency,
            activate,
        } => {
            let role = Role::from_str(&role).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid role '{}'. Valid roles: client, agent, operator, admin, superadmin",
                    role
                )
            })?;
            let opened = service
                .open_account(&name, role, currency.as_deref())
                .await?;
            let wallet = if activate {
                service.activate_wallet(opened.account.id).await?
            } else {
                opened.wallet
            };
            println!(
                "Opened account {}: {} ({})",
                opened.account.id, opened.account.name, opened.account.role
            );
            println!(
                "Wallet {} in {} ({})",
                wallet.id,
                wallet.currency,
                if wallet.is_active { "active" } else { "inactive" }
            );
        }

        AccountCommands::Show { id } => {
            let overview = service.wallet_overview(id).await?;
            let account = &overview.account;
            let wallet = &overview.wallet;

            println!("Account: {}", account.name);
            println!("  ID:       {}", account.id);
            println!("  Role:     {}", account.role);
            println!("  Status:   {}", account.status);
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!(
                "  Balance:  {} {}",
                format_amount(wallet.balance),
                wallet.currency
            );
            println!(
                "  Wallet:   {}",
                if wallet.is_active { "active" } else { "inactive" }
            );
        }

        AccountCommands::Status { id, status } => {
            let status = AccountStatus::from_str(&status).ok_or_else(|| {
                anyhow::anyhow!("Invalid status '{}'. Valid: active, inactive", status)
            })?;
            let account = service.set_account_status(id, status).await?;
            println!("Account {} is now {}", account.id, account.status);
        }
    }
    Ok(())
}

async fn run_wallet_command(service: &LedgerService, cmd: WalletCommands) -> Result<()> {
    match cmd {
        WalletCommands::Show { account } => {
            let wallet = service.get_wallet(account).await?;
            println!("Wallet of account {}", account);
            println!("  ID:       {}", wallet.id);
            println!(
                "  Balance:  {} {}",
                format_amount(wallet.balance),
                wallet.currency
            );
            println!(
                "  Status:   {}",
                if wallet.is_active { "active" } else { "inactive" }
            );
            if let Some(cap) = wallet.spending_cap {
                println!("  Cap:      {} {}", format_amount(cap), wallet.currency);
            }
            println!(
                "  Updated:  {}",
                wallet.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        WalletCommands::Activate { account } => {
            service.activate_wallet(account).await?;
            println!("Activated wallet of account {}", account);
        }

        WalletCommands::Deactivate { account } => {
            service.deactivate_wallet(account).await?;
            println!("Deactivated wallet of account {}", account);
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    account: i64,
    output: Option<&str>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match format {
        "csv" => {
            let count = exporter.export_statement_csv(account, writer).await?;
            if let Some(path) = output {
                eprintln!("Exported {} statement lines to {}", count, path);
            }
        }
        "json" => {
            exporter.export_statement_json(account, writer).await?;
            if let Some(path) = output {
                eprintln!("Exported statement to {}", path);
            }
        }
        other => anyhow::bail!("Unknown export format '{}'. Valid: csv, json", other),
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_command() {
        let cli = Cli::parse_from(["nummus", "transfer", "1500", "--from", "1", "--to", "2"]);
        match cli.command {
            Commands::Transfer { amount, from, to } => {
                assert_eq!(amount, "1500");
                assert_eq!(from, 1);
                assert_eq!(to, 2);
            }
            _ => panic!("expected transfer"),
        }
    }

    #[test]
    fn test_global_settings_after_subcommand() {
        let cli = Cli::parse_from(["nummus", "history", "3", "--database", "other.db", "-v"]);
        assert_eq!(cli.settings.database, "other.db");
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_cancel_transaction_reason_is_optional() {
        let cli = Cli::parse_from(["nummus", "cancel-transaction", "4"]);
        assert!(matches!(
            cli.command,
            Commands::CancelTransaction { id: 4, reason: None }
        ));

        let cli = Cli::parse_from(["nummus", "notifications", "2", "--purge-read"]);
        assert!(matches!(
            cli.command,
            Commands::Notifications {
                account: 2,
                purge_read: true,
                ..
            }
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer reason", 10), "a much ...");
    }
}
