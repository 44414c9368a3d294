use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    Account, AccountId, AccountStatus, Amount, EntryKind, LedgerEntry, MinorUnits, Notification,
    NotificationKind, Payment, Role, Transfer, TransferId, Wallet, WalletId, format_amount,
};
use crate::notify::Notifier;
use crate::storage::{AtomicUnit, Repository};

use super::{
    AppError, DepositCommand, LedgerSettings, PaymentCommand, TransferCommand, WithdrawCommand,
};

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, HTTP API, tests).
pub struct LedgerService {
    pub(super) repo: Repository,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) settings: LedgerSettings,
}

/// A freshly opened account together with its wallet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedAccount {
    pub account: Account,
    pub wallet: Wallet,
}

/// Result of a deposit, a withdrawal or the cancellation of either.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResult {
    pub entry: LedgerEntry,
    pub wallet: Wallet,
}

/// Result of a completed transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub transfer: Transfer,
    pub sender: Account,
    pub receiver: Account,
    pub sender_wallet: Wallet,
    pub receiver_wallet: Wallet,
}

/// Result of a merchant payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub payment: Payment,
    pub operator: Account,
    pub wallet: Wallet,
}

impl LedgerService {
    pub fn new(repo: Repository, notifier: Arc<dyn Notifier>, settings: LedgerSettings) -> Self {
        Self {
            repo,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Accounts & wallets
    // ========================

    /// Open a new account with an (inactive) empty wallet.
    #[tracing::instrument(skip(self))]
    pub async fn open_account(
        &self,
        name: &str,
        role: Role,
        currency: Option<&str>,
    ) -> Result<OpenedAccount, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Account name is required".to_string()));
        }
        let currency = currency.unwrap_or(&self.settings.currency).trim().to_uppercase();
        if currency.len() != 3 {
            return Err(AppError::Validation(format!(
                "Invalid currency code: {}",
                currency
            )));
        }

        let mut unit = self.repo.begin().await?;
        let account = unit
            .insert_account(name, role, AccountStatus::Active)
            .await?;
        let wallet = unit.insert_wallet(account.id, &currency).await?;
        unit.commit().await?;

        tracing::info!(account_id = account.id, role = %role, "account opened");
        Ok(OpenedAccount { account, wallet })
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    pub async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, AppError> {
        if !self.repo.set_account_status(id, status).await? {
            return Err(AppError::AccountNotFound(id));
        }
        tracing::info!(account_id = id, status = %status, "account status changed");
        self.get_account(id).await
    }

    pub async fn get_wallet(&self, account_id: AccountId) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet_by_account(account_id)
            .await?
            .ok_or(AppError::WalletNotFound(account_id))
    }

    pub async fn activate_wallet(&self, account_id: AccountId) -> Result<Wallet, AppError> {
        self.set_wallet_active(account_id, true).await
    }

    pub async fn deactivate_wallet(&self, account_id: AccountId) -> Result<Wallet, AppError> {
        self.set_wallet_active(account_id, false).await
    }

    async fn set_wallet_active(&self, account_id: AccountId, active: bool) -> Result<Wallet, AppError> {
        let wallet = self.get_wallet(account_id).await?;
        self.repo.set_wallet_active(wallet.id, active).await?;
        tracing::info!(account_id, active, "wallet activation changed");
        self.get_wallet(account_id).await
    }

    // ========================
    // Cash in / cash out
    // ========================

    /// Credit an account's wallet with cash handed to an agent.
    #[tracing::instrument(skip(self))]
    pub async fn deposit(&self, cmd: DepositCommand) -> Result<EntryResult, AppError> {
        let account = self.get_account(cmd.account_id).await?;
        let wallet = self.get_wallet(account.id).await?;

        let mut unit = self.repo.begin().await?;
        let wallet = credit(&mut unit, account.id, wallet.id, cmd.amount.get()).await?;
        let entry = unit
            .record_transaction(
                wallet.id,
                account.id,
                cmd.agent_id,
                cmd.amount.get(),
                EntryKind::Deposit,
            )
            .await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = entry.id,
            account_id = account.id,
            amount = entry.amount,
            balance = wallet.balance,
            "deposit committed"
        );
        self.notify(Notification::new(
            account.id,
            format!(
                "Deposit of {} {} completed",
                format_amount(entry.amount),
                wallet.currency
            ),
            NotificationKind::Transaction,
        ));

        Ok(EntryResult { entry, wallet })
    }

    /// Debit an account's wallet for cash paid out by an agent.
    #[tracing::instrument(skip(self))]
    pub async fn withdraw(&self, cmd: WithdrawCommand) -> Result<EntryResult, AppError> {
        let account = self.get_account(cmd.account_id).await?;
        self.require_role(cmd.agent_id, Role::Agent)
            .await?
            .ok_or(AppError::AgentNotFound(cmd.agent_id))?;
        let wallet = self.get_wallet(account.id).await?;

        let amount = cmd.amount.get();
        if !wallet.can_cover(amount) {
            return Err(AppError::InsufficientFunds {
                account_id: account.id,
                balance: wallet.balance,
                required: amount,
                fee: None,
            });
        }

        let mut unit = self.repo.begin().await?;
        let wallet = debit(&mut unit, account.id, wallet.id, amount, None).await?;
        let entry = unit
            .record_transaction(wallet.id, account.id, cmd.agent_id, amount, EntryKind::Withdraw)
            .await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = entry.id,
            account_id = account.id,
            amount,
            balance = wallet.balance,
            "withdrawal committed"
        );
        self.notify(Notification::new(
            account.id,
            format!(
                "Withdrawal of {} {} completed",
                format_amount(amount),
                wallet.currency
            ),
            NotificationKind::Transaction,
        ));

        Ok(EntryResult { entry, wallet })
    }

    // ========================
    // Transfers
    // ========================

    /// Move money between two accounts, charging the sender the transfer fee.
    #[tracing::instrument(skip(self))]
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<TransferResult, AppError> {
        if cmd.sender_id == cmd.receiver_id {
            return Err(AppError::Validation(
                "Sender and receiver must be different accounts".to_string(),
            ));
        }

        let sender = self.get_account(cmd.sender_id).await?;
        let receiver = self.get_account(cmd.receiver_id).await?;
        ensure_active(&sender)?;
        ensure_active(&receiver)?;

        let sender_wallet = self.get_wallet(sender.id).await?;
        let receiver_wallet = self.get_wallet(receiver.id).await?;
        if sender_wallet.currency != receiver_wallet.currency {
            return Err(AppError::Validation(format!(
                "Currency mismatch: {} -> {}",
                sender_wallet.currency, receiver_wallet.currency
            )));
        }

        let amount = cmd.amount.get();
        let fee = self.settings.fees.transfer_fee(cmd.amount);
        let total = self.settings.fees.total_debit(cmd.amount).ok_or_else(|| {
            AppError::InvalidAmount(format!("transfer of {} plus fee {} overflows", amount, fee))
        })?;
        if !sender_wallet.can_cover(total) {
            return Err(AppError::InsufficientFunds {
                account_id: sender.id,
                balance: sender_wallet.balance,
                required: total,
                fee: Some(fee),
            });
        }
        let platform = self.platform_wallet().await?;

        let mut unit = self.repo.begin().await?;
        let sender_wallet = debit(&mut unit, sender.id, sender_wallet.id, total, Some(fee)).await?;
        // Statuses may have changed since the pre-checks; the write lock is held now.
        for id in [sender.id, receiver.id] {
            let account = unit.account(id).await?.ok_or(AppError::AccountNotFound(id))?;
            ensure_active(&account)?;
        }
        let receiver_wallet = credit(&mut unit, receiver.id, receiver_wallet.id, amount).await?;
        let transfer = unit
            .record_transfer(sender.id, receiver.id, amount, fee)
            .await?;
        match platform {
            Some(platform) if fee > 0 => {
                credit(&mut unit, platform.account_id, platform.id, fee).await?;
            }
            Some(_) => {}
            None => tracing::warn!(fee, "fee charged but no platform wallet to credit"),
        }
        unit.commit().await?;

        tracing::info!(
            transfer_id = transfer.id,
            sender_id = sender.id,
            receiver_id = receiver.id,
            amount,
            fee,
            "transfer committed"
        );

        let currency = &sender_wallet.currency;
        self.notify(Notification::new(
            sender.id,
            format!(
                "Transfer of {} {} sent to {}",
                format_amount(amount),
                currency,
                receiver.name
            ),
            NotificationKind::Transfer,
        ));
        self.notify(Notification::new(
            receiver.id,
            format!(
                "You received {} {} from {}",
                format_amount(amount),
                currency,
                sender.name
            ),
            NotificationKind::Transfer,
        ));

        Ok(TransferResult {
            transfer,
            sender,
            receiver,
            sender_wallet,
            receiver_wallet,
        })
    }

    /// Repeat a previous transfer as a brand new one with a fresh fee.
    #[tracing::instrument(skip(self))]
    pub async fn resend_transfer(&self, id: TransferId) -> Result<TransferResult, AppError> {
        let original = self
            .repo
            .get_transfer(id)
            .await?
            .ok_or(AppError::TransferNotFound(id))?;

        let result = self
            .transfer(TransferCommand {
                sender_id: original.sender_id,
                receiver_id: original.receiver_id,
                amount: Amount::new(original.amount)?,
            })
            .await?;

        tracing::info!(
            original_id = id,
            transfer_id = result.transfer.id,
            "transfer resent"
        );
        Ok(result)
    }

    // ========================
    // Payments
    // ========================

    /// Pay a merchant operator from a client wallet.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, cmd: PaymentCommand) -> Result<PaymentResult, AppError> {
        let payer = self.get_account(cmd.account_id).await?;
        if payer.role != Role::Client {
            return Err(AppError::RoleNotAllowed {
                account_id: payer.id,
                role: payer.role,
                required: Role::Client,
            });
        }
        let operator = self
            .require_role(cmd.operator_id, Role::Operator)
            .await?
            .ok_or(AppError::OperatorNotFound(cmd.operator_id))?;

        let wallet = self.get_wallet(payer.id).await?;
        if !wallet.is_active {
            return Err(AppError::WalletInactive(payer.id));
        }

        let amount = cmd.amount.get();
        if !wallet.can_cover(amount) {
            return Err(AppError::InsufficientFunds {
                account_id: payer.id,
                balance: wallet.balance,
                required: amount,
                fee: None,
            });
        }

        let mut unit = self.repo.begin().await?;
        let wallet = debit(&mut unit, payer.id, wallet.id, amount, None).await?;
        if !wallet.is_active {
            return Err(AppError::WalletInactive(payer.id));
        }
        let payment = unit.record_payment(payer.id, operator.id, amount).await?;
        unit.commit().await?;

        tracing::info!(
            payment_id = payment.id,
            account_id = payer.id,
            operator_id = operator.id,
            amount,
            "payment committed"
        );
        self.notify(Notification::new(
            payer.id,
            format!(
                "Payment of {} {} to {} completed",
                format_amount(amount),
                wallet.currency,
                operator.name
            ),
            NotificationKind::Payment,
        ));

        Ok(PaymentResult {
            payment,
            operator,
            wallet,
        })
    }

    // ========================
    // Helpers
    // ========================

    /// Returns the account when it exists and carries `role`.
    pub(super) async fn require_role(
        &self,
        id: AccountId,
        role: Role,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .repo
            .get_account(id)
            .await?
            .filter(|account| account.role == role))
    }

    /// The wallet collecting fees, if one is configured and exists.
    pub(super) async fn platform_wallet(&self) -> Result<Option<Wallet>, AppError> {
        let Some(platform_id) = self.settings.platform_account else {
            tracing::warn!("no platform account configured");
            return Ok(None);
        };
        let wallet = self.repo.get_wallet_by_account(platform_id).await?;
        if wallet.is_none() {
            tracing::warn!(platform_id, "platform account has no wallet");
        }
        Ok(wallet)
    }

    /// Hand a notification to the notifier. Delivery never affects the caller.
    pub(super) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }
}

pub(super) fn ensure_active(account: &Account) -> Result<(), AppError> {
    if account.is_active() {
        Ok(())
    } else {
        Err(AppError::AccountInactive(account.id))
    }
}

/// Add `amount` to a wallet inside `unit`, failing with `BalanceLimit`
/// when the balance would no longer fit in `MinorUnits`.
pub(super) async fn credit(
    unit: &mut AtomicUnit,
    account_id: AccountId,
    wallet_id: WalletId,
    amount: MinorUnits,
) -> Result<Wallet, AppError> {
    if let Some(wallet) = unit.adjust_balance(wallet_id, amount).await? {
        return Ok(wallet);
    }
    match unit.wallet(wallet_id).await? {
        Some(wallet) => Err(AppError::BalanceLimit {
            account_id,
            balance: wallet.balance,
            credit: amount,
        }),
        None => Err(AppError::WalletNotFound(account_id)),
    }
}

/// Take `amount` out of a wallet inside `unit`, failing with
/// `InsufficientFunds` when the balance would go negative.
pub(super) async fn debit(
    unit: &mut AtomicUnit,
    account_id: AccountId,
    wallet_id: WalletId,
    amount: MinorUnits,
    fee: Option<MinorUnits>,
) -> Result<Wallet, AppError> {
    if let Some(wallet) = unit.adjust_balance(wallet_id, -amount).await? {
        return Ok(wallet);
    }
    match unit.wallet(wallet_id).await? {
        Some(wallet) => Err(AppError::InsufficientFunds {
            account_id,
            balance: wallet.balance,
            required: amount,
            fee,
        }),
        None => Err(AppError::WalletNotFound(account_id)),
    }
}
