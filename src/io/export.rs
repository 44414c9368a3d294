use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::{AccountStatement, LedgerService};
use crate::domain::{
    AccountId, EntryStatus, MinorUnits, PaymentStatus, TransferStatus, format_amount,
};

/// Statement wrapper written by the JSON export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub statement: AccountStatement,
}

/// One line of an account statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLine {
    pub date: DateTime<Utc>,
    pub kind: &'static str,
    pub reference: i64,
    pub amount: MinorUnits,
    pub fee: MinorUnits,
    pub status: &'static str,
    pub counterparty: Option<AccountId>,
    /// Signed effect on the account's balance while the record stands.
    pub effect: MinorUnits,
}

/// Flatten a statement into lines, newest first.
pub fn statement_lines(statement: &AccountStatement) -> Vec<StatementLine> {
    let account_id = statement.account.id;
    let mut lines = Vec::new();

    for entry in &statement.transactions {
        let effect = match entry.status {
            EntryStatus::Success => entry.balance_delta(),
            EntryStatus::Failed => 0,
        };
        lines.push(StatementLine {
            date: entry.created_at,
            kind: entry.kind.as_str(),
            reference: entry.id,
            amount: entry.amount,
            fee: 0,
            status: entry.status.as_str(),
            counterparty: Some(entry.agent_id),
            effect,
        });
    }

    for transfer in &statement.transfers {
        let outgoing = transfer.sender_id == account_id;
        let effect = match (transfer.status, outgoing) {
            (TransferStatus::Cancelled, _) => 0,
            (TransferStatus::Completed, true) => -transfer.total_debit(),
            (TransferStatus::Completed, false) => transfer.amount,
        };
        lines.push(StatementLine {
            date: transfer.created_at,
            kind: if outgoing { "TRANSFER_OUT" } else { "TRANSFER_IN" },
            reference: transfer.id,
            amount: transfer.amount,
            fee: if outgoing { transfer.fee } else { 0 },
            status: transfer.status.as_str(),
            counterparty: Some(if outgoing {
                transfer.receiver_id
            } else {
                transfer.sender_id
            }),
            effect,
        });
    }

    for payment in &statement.payments {
        let effect = match payment.status {
            PaymentStatus::Success => -payment.amount,
        };
        lines.push(StatementLine {
            date: payment.created_at,
            kind: "PAYMENT",
            reference: payment.id,
            amount: payment.amount,
            fee: 0,
            status: payment.status.as_str(),
            counterparty: Some(payment.operator_id),
            effect,
        });
    }

    lines.sort_by(|a, b| b.date.cmp(&a.date).then(b.reference.cmp(&a.reference)));
    lines
}

/// Exporter for account statements.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export an account statement to CSV. Returns the number of lines written.
    pub async fn export_statement_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let statement = self.service.statement(account_id).await?;
        let lines = statement_lines(&statement);
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "date",
            "type",
            "reference",
            "amount",
            "fee",
            "status",
            "counterparty",
            "effect",
            "currency",
        ])?;

        for line in &lines {
            csv_writer.write_record([
                line.date.to_rfc3339(),
                line.kind.to_string(),
                line.reference.to_string(),
                line.amount.to_string(),
                line.fee.to_string(),
                line.status.to_string(),
                line.counterparty.map(|id| id.to_string()).unwrap_or_default(),
                line.effect.to_string(),
                statement.wallet.currency.clone(),
            ])?;
        }

        csv_writer.flush()?;
        tracing::debug!(
            account_id,
            lines = lines.len(),
            balance = %format_amount(statement.wallet.balance),
            "statement exported"
        );
        Ok(lines.len())
    }

    /// Export an account statement as pretty JSON.
    pub async fn export_statement_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<StatementSnapshot> {
        let statement = self.service.statement(account_id).await?;
        let snapshot = StatementSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            statement,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;
        Ok(snapshot)
    }
}
