//! Request and response bodies. Field names follow the mobile client's
//! contract (`compteId`, `transfert`, `frais`, ...).

use serde::{Deserialize, Serialize};

use crate::application::{
    AppError, CancelTransactionCommand, DepositCommand, PageRequest, Pagination, PaymentCommand,
    TransactionFilter, TransactionStats, TransferCommand, WithdrawCommand, parse_date,
};
use crate::domain::{
    AccountId, Amount, EntryKind, EntryStatus, InvalidAmount, LedgerEntry, MinorUnits, Payment,
    Transfer,
};

// =============================================================================
// Requests
// =============================================================================

/// Body of a deposit or withdrawal.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRequest {
    pub amount: Option<i64>,
    pub compte_id: Option<AccountId>,
    pub agent_id: Option<AccountId>,
}

impl TryFrom<CashRequest> for DepositCommand {
    type Error = AppError;

    fn try_from(req: CashRequest) -> Result<Self, AppError> {
        Ok(Self {
            amount: amount(req.amount)?,
            account_id: required(req.compte_id, "compteId")?,
            agent_id: required(req.agent_id, "agentId")?,
        })
    }
}

impl TryFrom<CashRequest> for WithdrawCommand {
    type Error = AppError;

    fn try_from(req: CashRequest) -> Result<Self, AppError> {
        Ok(Self {
            amount: amount(req.amount)?,
            account_id: required(req.compte_id, "compteId")?,
            agent_id: required(req.agent_id, "agentId")?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender_id: Option<AccountId>,
    pub receiver_id: Option<AccountId>,
    pub amount: Option<i64>,
}

impl TryFrom<TransferRequest> for TransferCommand {
    type Error = AppError;

    fn try_from(req: TransferRequest) -> Result<Self, AppError> {
        Ok(Self {
            sender_id: required(req.sender_id, "senderId")?,
            receiver_id: required(req.receiver_id, "receiverId")?,
            amount: amount(req.amount)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub compte_id: Option<AccountId>,
    pub operateur_id: Option<AccountId>,
    pub amount: Option<i64>,
}

impl TryFrom<PaymentRequest> for PaymentCommand {
    type Error = AppError;

    fn try_from(req: PaymentRequest) -> Result<Self, AppError> {
        Ok(Self {
            account_id: required(req.compte_id, "compteId")?,
            operator_id: required(req.operateur_id, "operateurId")?,
            amount: amount(req.amount)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelTransactionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelTransactionRequest {
    pub fn into_command(self, transaction_id: i64) -> CancelTransactionCommand {
        match self.reason {
            Some(reason) => CancelTransactionCommand::new(transaction_id, reason),
            None => CancelTransactionCommand::without_reason(transaction_id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub compte_id: Option<AccountId>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = AppError;

    fn try_from(query: TransactionQuery) -> Result<Self, AppError> {
        let kind = query
            .kind
            .as_deref()
            .map(|s| {
                EntryKind::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown transaction type: {}", s)))
            })
            .transpose()?;
        let status = query
            .status
            .as_deref()
            .map(|s| {
                EntryStatus::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown status: {}", s)))
            })
            .transpose()?;

        Ok(Self {
            account_id: query.compte_id,
            kind,
            status,
            from_date: query
                .start_date
                .as_deref()
                .map(|d| parse_date(d, false))
                .transpose()?,
            to_date: query
                .end_date
                .as_deref()
                .map(|d| parse_date(d, true))
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TryFrom<PageQuery> for PageRequest {
    type Error = AppError;

    fn try_from(query: PageQuery) -> Result<Self, AppError> {
        PageRequest::new(query.page, query.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

fn amount(value: Option<i64>) -> Result<Amount, AppError> {
    let value = value.ok_or(InvalidAmount::Missing)?;
    Ok(Amount::new(value)?)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    pub transaction: LedgerEntry,
    pub solde: MinorUnits,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub success: bool,
    pub data: Vec<LedgerEntry>,
    pub stats: TransactionStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: TransactionStats,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub success: bool,
    pub transfert: Transfer,
    pub frais: MinorUnits,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TransferHistoryResponse {
    pub success: bool,
    pub transferts: Vec<Transfer>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub success: bool,
    pub paiements: Vec<Payment>,
    pub pagination: Pagination,
}

/// Generic `{success, data, message?}` envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
