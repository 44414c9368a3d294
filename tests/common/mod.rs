// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use nummus::application::{DepositCommand, LedgerService, LedgerSettings};
use nummus::domain::{Account, AccountId, Amount, MinorUnits, Notification, Role};
use nummus::notify::{Notifier, NullNotifier};
use nummus::storage::Repository;
use tempfile::TempDir;

/// Notifier that keeps everything it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn for_account(&self, account_id: AccountId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.account_id == account_id)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

/// Accounts every ledger test starts with. All wallets are active and empty.
pub struct Fixture {
    pub service: LedgerService,
    pub notifier: Arc<RecordingNotifier>,
    pub repo: Repository,
    pub client: Account,
    pub friend: Account,
    pub agent: Account,
    pub operator: Account,
    pub platform: Account,
    _temp: TempDir,
}

impl Fixture {
    pub async fn balance(&self, account_id: AccountId) -> MinorUnits {
        self.service.get_wallet(account_id).await.unwrap().balance
    }

    /// Deposit through the fixture agent.
    pub async fn fund(&self, account_id: AccountId, amount: MinorUnits) -> Result<()> {
        self.service
            .deposit(DepositCommand {
                account_id,
                agent_id: self.agent.id,
                amount: amount_of(amount),
            })
            .await?;
        Ok(())
    }

    /// Rebuild the service over the same database with other settings.
    pub fn with_settings(self, settings: LedgerSettings) -> Self {
        let service = LedgerService::new(self.repo.clone(), self.notifier.clone(), settings);
        Self { service, ..self }
    }
}

pub fn amount_of(value: MinorUnits) -> Amount {
    Amount::new(value).unwrap()
}

pub async fn test_repo() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}", db_path.display())).await?;
    Ok((repo, temp_dir))
}

/// Ledger with default settings and a platform account collecting fees.
pub async fn test_ledger() -> Result<Fixture> {
    test_ledger_with(LedgerSettings::default()).await
}

/// Ledger with the given settings. The platform account is always opened;
/// it collects fees unless `settings.platform_account` is already set.
pub async fn test_ledger_with(mut settings: LedgerSettings) -> Result<Fixture> {
    let (repo, temp) = test_repo().await?;

    let setup = LedgerService::new(repo.clone(), Arc::new(NullNotifier), settings.clone());
    let client = open(&setup, "Awa Diallo", Role::Client).await?;
    let friend = open(&setup, "Moussa Traore", Role::Client).await?;
    let agent = open(&setup, "Agent Kone", Role::Agent).await?;
    let operator = open(&setup, "Canal Shop", Role::Operator).await?;
    let platform = open(&setup, "Platform", Role::Admin).await?;

    if settings.platform_account.is_none() {
        settings.platform_account = Some(platform.id);
    }

    let notifier = Arc::new(RecordingNotifier::default());
    let service = LedgerService::new(repo.clone(), notifier.clone(), settings);

    Ok(Fixture {
        service,
        notifier,
        repo,
        client,
        friend,
        agent,
        operator,
        platform,
        _temp: temp,
    })
}

async fn open(service: &LedgerService, name: &str, role: Role) -> Result<Account> {
    let opened = service.open_account(name, role, None).await?;
    service.activate_wallet(opened.account.id).await?;
    Ok(opened.account)
}
