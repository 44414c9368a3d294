use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    MinorUnits, Notification, NotificationKind, Transfer, TransferId, Wallet, format_amount,
};
use crate::storage::AtomicUnit;

use super::service::{credit, debit};
use super::{AppError, CancelTransactionCommand, EntryResult, LedgerService};

/// Result of cancelling a transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTransferResult {
    pub transfer: Transfer,
    pub sender_wallet: Wallet,
    pub receiver_wallet: Wallet,
    /// Amount handed back to the sender, fee included.
    pub refunded: MinorUnits,
}

impl LedgerService {
    /// Cancel a completed transfer, measuring the window against the current time.
    pub async fn cancel_transfer(&self, id: TransferId) -> Result<CancelTransferResult, AppError> {
        self.cancel_transfer_at(id, Utc::now()).await
    }

    /// Cancel a completed transfer as of `now`.
    ///
    /// The receiver gives back the amount, the platform gives back the fee,
    /// and the sender recovers both. The fee is refunded even when no platform
    /// wallet is reachable to give it back. Rejected with `InsufficientFunds`
    /// if the receiver or the platform no longer holds enough.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_transfer_at(
        &self,
        id: TransferId,
        now: DateTime<Utc>,
    ) -> Result<CancelTransferResult, AppError> {
        let transfer = self
            .repo
            .get_transfer(id)
            .await?
            .ok_or(AppError::TransferNotFound(id))?;

        if !transfer.is_completed() {
            return Err(AppError::NotCancellable(id));
        }
        let window = self.settings.cancellation_window;
        if !transfer.within_window(now, window) {
            return Err(AppError::CancellationWindowExpired {
                transfer_id: id,
                window_minutes: window.num_minutes(),
            });
        }

        let sender_wallet = self.get_wallet(transfer.sender_id).await?;
        let receiver_wallet = self.get_wallet(transfer.receiver_id).await?;

        let mut unit = self.repo.begin().await?;
        // Only one concurrent cancellation can flip the status.
        let transfer = unit
            .mark_transfer_cancelled(id, now)
            .await?
            .ok_or(AppError::NotCancellable(id))?;
        let receiver_wallet = debit(
            &mut unit,
            transfer.receiver_id,
            receiver_wallet.id,
            transfer.amount,
            None,
        )
        .await?;
        self.recover_fee(&mut unit, transfer.fee).await?;
        let refunded = transfer.total_debit();
        let sender_wallet = credit(&mut unit, transfer.sender_id, sender_wallet.id, refunded).await?;
        unit.commit().await?;

        tracing::info!(
            transfer_id = id,
            sender_id = transfer.sender_id,
            receiver_id = transfer.receiver_id,
            refunded,
            "transfer cancelled"
        );

        let amount = format_amount(transfer.amount);
        let currency = &sender_wallet.currency;
        self.notify(Notification::new(
            transfer.sender_id,
            format!("Your transfer of {} {} was cancelled", amount, currency),
            NotificationKind::Transfer,
        ));
        self.notify(Notification::new(
            transfer.receiver_id,
            format!(
                "The transfer of {} {} was cancelled by the sender",
                amount, currency
            ),
            NotificationKind::Transfer,
        ));

        Ok(CancelTransferResult {
            refunded,
            transfer,
            sender_wallet,
            receiver_wallet,
        })
    }

    /// Cancel a deposit or a withdrawal, reversing its effect on the wallet.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_transaction(
        &self,
        cmd: CancelTransactionCommand,
    ) -> Result<EntryResult, AppError> {
        let id = cmd.transaction_id;
        let entry = self
            .repo
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))?;
        if !entry.is_cancellable() {
            return Err(AppError::AlreadyCancelled(id));
        }

        let mut unit = self.repo.begin().await?;
        let Some(entry) = unit
            .mark_transaction_failed(id, cmd.reason.as_deref())
            .await?
        else {
            return Err(AppError::AlreadyCancelled(id));
        };
        let delta = entry.reversal_delta();
        let wallet = if delta < 0 {
            debit(&mut unit, entry.account_id, entry.wallet_id, -delta, None).await?
        } else {
            credit(&mut unit, entry.account_id, entry.wallet_id, delta).await?
        };
        unit.commit().await?;

        tracing::info!(
            transaction_id = id,
            account_id = entry.account_id,
            kind = entry.kind.as_str(),
            "transaction cancelled"
        );

        let mut content = format!(
            "{} of {} {} cancelled",
            entry.kind.label(),
            format_amount(entry.amount),
            wallet.currency
        );
        if let Some(reason) = &cmd.reason {
            content.push_str(&format!(". Reason: {}", reason));
        }
        self.notify(Notification::new(
            entry.account_id,
            content,
            NotificationKind::Transaction,
        ));

        Ok(EntryResult { entry, wallet })
    }

    /// Take a transfer fee back out of the platform wallet, if one is reachable.
    async fn recover_fee(&self, unit: &mut AtomicUnit, fee: MinorUnits) -> Result<(), AppError> {
        if fee == 0 {
            return Ok(());
        }
        match self.platform_wallet().await? {
            Some(platform) => {
                debit(unit, platform.account_id, platform.id, fee, None).await?;
            }
            None => tracing::warn!(fee, "fee refunded without a platform wallet to debit"),
        }
        Ok(())
    }
}
