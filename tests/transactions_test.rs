mod common;

use anyhow::Result;
use common::{amount_of, test_ledger};
use nummus::application::{
    AppError, CancelTransactionCommand, DepositCommand, ErrorKind, TransactionFilter,
    WithdrawCommand,
};
use nummus::domain::{EntryKind, EntryStatus, MAX_AMOUNT, NotificationKind};

#[tokio::test]
async fn test_deposit_credits_wallet_and_notifies() -> Result<()> {
    let fx = test_ledger().await?;

    let result = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(1500),
        })
        .await?;

    assert_eq!(result.wallet.balance, 1500);
    assert_eq!(result.entry.kind, EntryKind::Deposit);
    assert_eq!(result.entry.status, EntryStatus::Success);
    assert_eq!(result.entry.agent_id, fx.agent.id);
    assert_eq!(fx.balance(fx.client.id).await, 1500);

    let sent = fx.notifier.for_account(fx.client.id);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Transaction);
    assert_eq!(sent[0].content, "Deposit of 1 500 XOF completed");

    Ok(())
}

#[tokio::test]
async fn test_deposit_to_unknown_account() -> Result<()> {
    let fx = test_ledger().await?;

    let err = fx
        .service
        .deposit(DepositCommand {
            account_id: 9999,
            agent_id: fx.agent.id,
            amount: amount_of(100),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccountNotFound(9999)));
    assert!(fx.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_withdraw_debits_wallet() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 1000).await?;

    let result = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(400),
        })
        .await?;

    assert_eq!(result.wallet.balance, 600);
    assert_eq!(result.entry.kind, EntryKind::Withdraw);
    assert_eq!(
        fx.notifier.for_account(fx.client.id).last().unwrap().content,
        "Withdrawal of 400 XOF completed"
    );
    Ok(())
}

#[tokio::test]
async fn test_withdraw_entire_balance() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 500).await?;

    let result = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(500),
        })
        .await?;

    assert_eq!(result.wallet.balance, 0);
    Ok(())
}

#[tokio::test]
async fn test_withdraw_insufficient_funds_leaves_balance() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 300).await?;
    fx.notifier.clear();

    let err = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(301),
        })
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientFunds {
            account_id,
            balance,
            required,
            fee,
        } => {
            assert_eq!(account_id, fx.client.id);
            assert_eq!(balance, 300);
            assert_eq!(required, 301);
            assert_eq!(fee, None);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    assert_eq!(fx.balance(fx.client.id).await, 300);
    assert!(fx.notifier.sent().is_empty());

    let withdrawals = fx
        .service
        .list_transactions(&TransactionFilter {
            kind: Some(EntryKind::Withdraw),
            ..Default::default()
        })
        .await?;
    assert!(withdrawals.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_withdraw_requires_agent() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 300).await?;

    // An existing account that is not an agent.
    let err = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.friend.id,
            amount: amount_of(100),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AgentNotFound(id) if id == fx.friend.id));

    let err = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: 4242,
            amount: amount_of(100),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AgentNotFound(4242)));

    assert_eq!(fx.balance(fx.client.id).await, 300);
    Ok(())
}

#[tokio::test]
async fn test_cancel_deposit_reverses_balance() -> Result<()> {
    let fx = test_ledger().await?;
    let deposit = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(800),
        })
        .await?;

    let result = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(deposit.entry.id, "wrong account"))
        .await?;

    assert_eq!(result.wallet.balance, 0);
    assert_eq!(result.entry.status, EntryStatus::Failed);
    assert_eq!(result.entry.cancel_reason.as_deref(), Some("wrong account"));

    let stored = fx.service.get_transaction(deposit.entry.id).await?;
    assert_eq!(stored.status, EntryStatus::Failed);

    assert_eq!(
        fx.notifier.for_account(fx.client.id).last().unwrap().content,
        "Deposit of 800 XOF cancelled. Reason: wrong account"
    );
    Ok(())
}

#[tokio::test]
async fn test_cancel_withdrawal_credits_back() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 1000).await?;
    let withdrawal = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(250),
        })
        .await?;
    assert_eq!(fx.balance(fx.client.id).await, 750);

    let result = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(withdrawal.entry.id, "cash not handed out"))
        .await?;

    assert_eq!(result.wallet.balance, 1000);
    Ok(())
}

#[tokio::test]
async fn test_cancel_without_reason() -> Result<()> {
    let fx = test_ledger().await?;
    let deposit = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(400),
        })
        .await?;

    let result = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(deposit.entry.id, "  "))
        .await?;

    assert_eq!(result.entry.status, EntryStatus::Failed);
    assert!(result.entry.cancel_reason.is_none());
    assert_eq!(result.wallet.balance, 0);
    assert_eq!(
        fx.notifier.for_account(fx.client.id).last().unwrap().content,
        "Deposit of 400 XOF cancelled"
    );
    Ok(())
}

#[tokio::test]
async fn test_deposit_past_balance_ceiling_is_refused() -> Result<()> {
    let fx = test_ledger().await?;
    let wallet = fx.service.get_wallet(fx.client.id).await?;
    let near_max = i64::MAX - 10;

    let mut unit = fx.repo.begin().await?;
    let raised = unit.adjust_balance(wallet.id, near_max).await?;
    assert_eq!(raised.map(|w| w.balance), Some(near_max));
    assert!(unit.adjust_balance(wallet.id, 11).await?.is_none());
    unit.commit().await?;

    let err = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(MAX_AMOUNT),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::BalanceLimit { balance, credit, .. } if balance == near_max && credit == MAX_AMOUNT
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    // Still stored as an integer and still readable.
    assert_eq!(fx.balance(fx.client.id).await, near_max);

    fx.fund(fx.client.id, 10).await?;
    assert_eq!(fx.balance(fx.client.id).await, i64::MAX);
    Ok(())
}

#[tokio::test]
async fn test_cancel_transaction_twice() -> Result<()> {
    let fx = test_ledger().await?;
    let deposit = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(500),
        })
        .await?;

    fx.service
        .cancel_transaction(CancelTransactionCommand::new(deposit.entry.id, "duplicate"))
        .await?;
    let err = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(deposit.entry.id, "again"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AlreadyCancelled(id) if id == deposit.entry.id));
    assert_eq!(fx.balance(fx.client.id).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_cancel_spent_deposit_is_rejected() -> Result<()> {
    let fx = test_ledger().await?;
    let deposit = fx
        .service
        .deposit(DepositCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(500),
        })
        .await?;
    fx.service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(400),
        })
        .await?;

    let err = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(deposit.entry.id, "fraud"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientFunds {
            balance: 100,
            required: 500,
            ..
        }
    ));
    // Nothing changed: the status flip was rolled back with the debit.
    assert_eq!(fx.balance(fx.client.id).await, 100);
    let stored = fx.service.get_transaction(deposit.entry.id).await?;
    assert_eq!(stored.status, EntryStatus::Success);
    assert!(stored.cancel_reason.is_none());
    Ok(())
}

#[tokio::test]
async fn test_cancel_unknown_transaction() -> Result<()> {
    let fx = test_ledger().await?;

    let err = fx
        .service
        .cancel_transaction(CancelTransactionCommand::new(77, "typo"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionNotFound(77)));
    Ok(())
}

#[tokio::test]
async fn test_list_and_stats() -> Result<()> {
    let fx = test_ledger().await?;
    fx.fund(fx.client.id, 1000).await?;
    fx.fund(fx.client.id, 500).await?;
    fx.fund(fx.friend.id, 300).await?;
    let withdrawal = fx
        .service
        .withdraw(WithdrawCommand {
            account_id: fx.client.id,
            agent_id: fx.agent.id,
            amount: amount_of(200),
        })
        .await?;
    fx.service
        .cancel_transaction(CancelTransactionCommand::new(withdrawal.entry.id, "mistake"))
        .await?;

    let client_entries = fx
        .service
        .list_transactions(&TransactionFilter {
            account_id: Some(fx.client.id),
            ..Default::default()
        })
        .await?;
    assert_eq!(client_entries.len(), 3);
    // Newest first.
    assert_eq!(client_entries[0].id, withdrawal.entry.id);

    let failed = fx
        .service
        .list_transactions(&TransactionFilter {
            status: Some(EntryStatus::Failed),
            ..Default::default()
        })
        .await?;
    assert_eq!(failed.len(), 1);

    let stats = fx
        .service
        .transaction_stats(Some(fx.client.id), None, None)
        .await?;
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.deposits.count, 2);
    assert_eq!(stats.deposits.total, 1500);
    assert_eq!(stats.withdrawals.count, 1);
    assert_eq!(stats.withdrawals.total, 200);
    assert_eq!(stats.successful_transactions, 2);
    assert_eq!(stats.failed_transactions, 1);

    let all = fx.service.transaction_stats(None, None, None).await?;
    assert_eq!(all.total_transactions, 4);
    Ok(())
}
