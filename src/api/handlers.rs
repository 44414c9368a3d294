//! Route handlers. Each one turns its request into a validated command,
//! calls the ledger and wraps the outcome in the client's envelope.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::application::{
    DepositCommand, PageRequest, PaymentCommand, TransactionFilter, TransferCommand,
    TransferResult, WalletOverview, WithdrawCommand,
};
use crate::domain::{InboxNotification, Payment};

use super::AppState;
use super::dto::*;
use super::error::ApiResult;

type Created<T> = (StatusCode, Json<T>);

// =============================================================================
// Transactions
// =============================================================================

pub async fn deposit(
    State(state): State<AppState>,
    body: Result<Json<CashRequest>, JsonRejection>,
) -> ApiResult<Created<TransactionResponse>> {
    let Json(req) = body?;
    let result = state.ledger.deposit(DepositCommand::try_from(req)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            success: true,
            solde: result.wallet.balance,
            transaction: result.entry,
            message: "Deposit completed".to_string(),
        }),
    ))
}

pub async fn withdraw(
    State(state): State<AppState>,
    body: Result<Json<CashRequest>, JsonRejection>,
) -> ApiResult<Created<TransactionResponse>> {
    let Json(req) = body?;
    let result = state.ledger.withdraw(WithdrawCommand::try_from(req)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            success: true,
            solde: result.wallet.balance,
            transaction: result.entry,
            message: "Withdrawal completed".to_string(),
        }),
    ))
}

pub async fn cancel_transaction(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Option<Json<CancelTransactionRequest>>,
) -> ApiResult<Json<TransactionResponse>> {
    let Path(id) = path?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let result = state.ledger.cancel_transaction(req.into_command(id)).await?;

    Ok(Json(TransactionResponse {
        success: true,
        solde: result.wallet.balance,
        transaction: result.entry,
        message: "Transaction cancelled".to_string(),
    }))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> ApiResult<Json<TransactionListResponse>> {
    let Query(query) = query?;
    let filter = TransactionFilter::try_from(query)?;
    let data = state.ledger.list_transactions(&filter).await?;
    let stats = state
        .ledger
        .transaction_stats(filter.account_id, filter.from_date, filter.to_date)
        .await?;

    Ok(Json(TransactionListResponse {
        success: true,
        data,
        stats,
    }))
}

pub async fn transaction_stats(
    State(state): State<AppState>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> ApiResult<Json<StatsResponse>> {
    let Query(query) = query?;
    let filter = TransactionFilter::try_from(query)?;
    let stats = state
        .ledger
        .transaction_stats(filter.account_id, filter.from_date, filter.to_date)
        .await?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

// =============================================================================
// Transfers
// =============================================================================

fn transfer_created(result: TransferResult, message: &str) -> Created<TransferResponse> {
    (
        StatusCode::CREATED,
        Json(TransferResponse {
            success: true,
            frais: result.transfer.fee,
            transfert: result.transfer,
            message: message.to_string(),
        }),
    )
}

pub async fn create_transfer(
    State(state): State<AppState>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Created<TransferResponse>> {
    let Json(req) = body?;
    let result = state.ledger.transfer(TransferCommand::try_from(req)?).await?;
    Ok(transfer_created(result, "Transfer completed"))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TransferResponse>> {
    let Path(id) = path?;
    let result = state.ledger.cancel_transfer(id).await?;

    Ok(Json(TransferResponse {
        success: true,
        frais: result.transfer.fee,
        transfert: result.transfer,
        message: "Transfer cancelled".to_string(),
    }))
}

pub async fn resend_transfer(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Created<TransferResponse>> {
    let Path(id) = path?;
    let result = state.ledger.resend_transfer(id).await?;
    Ok(transfer_created(result, "Transfer resent"))
}

pub async fn transfer_history(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<TransferHistoryResponse>> {
    let Path(account_id) = path?;
    let Query(query) = query?;
    let page = state
        .ledger
        .transfer_history(account_id, PageRequest::try_from(query)?)
        .await?;

    Ok(Json(TransferHistoryResponse {
        success: true,
        transferts: page.items,
        pagination: page.pagination,
    }))
}

// =============================================================================
// Payments
// =============================================================================

pub async fn create_payment(
    State(state): State<AppState>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<Created<DataResponse<Payment>>> {
    let Json(req) = body?;
    let result = state.ledger.pay(PaymentCommand::try_from(req)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(result.payment).with_message("Payment completed")),
    ))
}

pub async fn get_payment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DataResponse<Payment>>> {
    let Path(id) = path?;
    let payment = state.ledger.get_payment(id).await?;
    Ok(Json(DataResponse::new(payment)))
}

pub async fn payment_history(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<PaymentHistoryResponse>> {
    let Path(account_id) = path?;
    let Query(query) = query?;
    let page = state
        .ledger
        .payment_history(account_id, PageRequest::try_from(query)?)
        .await?;

    Ok(Json(PaymentHistoryResponse {
        success: true,
        paiements: page.items,
        pagination: page.pagination,
    }))
}

// =============================================================================
// Wallets
// =============================================================================

pub async fn get_wallet(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DataResponse<WalletOverview>>> {
    let Path(account_id) = path?;
    let overview = state.ledger.wallet_overview(account_id).await?;
    Ok(Json(DataResponse::new(overview)))
}

// =============================================================================
// Notifications
// =============================================================================

pub async fn list_notifications(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Vec<InboxNotification>>>> {
    let Path(account_id) = path?;
    let Query(query) = query?;
    let notifications = state
        .ledger
        .notifications(account_id, query.unread)
        .await?;
    Ok(Json(DataResponse::new(notifications)))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = path?;
    state.ledger.mark_notification_read(id).await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(account_id) = path?;
    let count = state.ledger.mark_all_notifications_read(account_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} notifications marked as read",
        count
    ))))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = path?;
    state.ledger.delete_notification(id).await?;
    Ok(Json(MessageResponse::new("Notification deleted")))
}

pub async fn delete_read_notifications(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(account_id) = path?;
    let count = state.ledger.delete_read_notifications(account_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} read notifications deleted",
        count
    ))))
}

// =============================================================================
// Health
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
