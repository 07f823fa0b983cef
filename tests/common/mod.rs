//! Common test utilities
//!
//! Scriptable fake collaborators wired into a `TransferOrchestrator`.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use transfer_saga::audit::InMemoryAuditLog;
use transfer_saga::fraud::FraudService;
use transfer_saga::notification::NotificationService;
use transfer_saga::store::{
    AccountStore, InMemoryAccountStore, InMemoryTransactionStore, TransactionStore,
};
use transfer_saga::{
    Account, AccountStatus, AccountType, OrchestratorSettings, Transaction, TransactionStatus,
    TransferOrchestrator,
};

pub const SOURCE: &str = "1234567899";
pub const TARGET: &str = "1234567897";
pub const OTHER: &str = "1234567890";

pub fn account(number: &str, balance: Decimal) -> Account {
    Account::new(number, "Test Owner", "CC12345678", balance, AccountType::Savings)
}

// =========================================================================
// Account store
// =========================================================================

/// In-memory account store whose saves can be made to fail by call number
#[derive(Default)]
pub struct FlakyAccountStore {
    pub inner: InMemoryAccountStore,
    find_calls: AtomicUsize,
    save_calls: AtomicUsize,
    failing_saves: Mutex<HashSet<usize>>,
}

impl FlakyAccountStore {
    /// Fail the given 1-based save calls
    pub fn fail_save_calls(&self, calls: &[usize]) {
        self.failing_saves.lock().unwrap().extend(calls.iter().copied());
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn balance(&self, number: &str) -> Decimal {
        self.inner.get(number).unwrap().balance
    }
}

#[async_trait]
impl AccountStore for FlakyAccountStore {
    async fn find_by_number(&self, account_number: &str) -> anyhow::Result<Option<Account>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_number(account_number).await
    }

    async fn save(&self, account: Account) -> anyhow::Result<Account> {
        let call = self.save_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_saves.lock().unwrap().contains(&call) {
            anyhow::bail!("account store unavailable on save #{}", call);
        }
        self.inner.save(account).await
    }
}

// =========================================================================
// Transaction store
// =========================================================================

#[derive(Default)]
pub struct FlakyTransactionStore {
    pub inner: InMemoryTransactionStore,
    fail_save: Mutex<bool>,
}

impl FlakyTransactionStore {
    pub fn set_fail_save(&self, fail: bool) {
        *self.fail_save.lock().unwrap() = fail;
    }

    pub fn completed(&self) -> Vec<Transaction> {
        self.inner
            .all()
            .into_iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .collect()
    }
}

#[async_trait]
impl TransactionStore for FlakyTransactionStore {
    async fn find_by_id(&self, transaction_id: Uuid) -> anyhow::Result<Option<Transaction>> {
        self.inner.find_by_id(transaction_id).await
    }

    async fn save(&self, transaction: Transaction) -> anyhow::Result<Transaction> {
        if *self.fail_save.lock().unwrap() {
            anyhow::bail!("transaction store unavailable");
        }
        self.inner.save(transaction).await
    }

    async fn find_by_status(&self, status: TransactionStatus) -> anyhow::Result<Vec<Transaction>> {
        self.inner.find_by_status(status).await
    }
}

// =========================================================================
// Fraud service
// =========================================================================

pub struct ScriptedFraudService {
    is_safe: Mutex<bool>,
    risk_score: Mutex<u8>,
    delay: Mutex<Option<Duration>>,
    fail: Mutex<bool>,
    validate_calls: AtomicUsize,
    reports: Mutex<Vec<(Uuid, String)>>,
}

impl Default for ScriptedFraudService {
    fn default() -> Self {
        Self {
            is_safe: Mutex::new(true),
            risk_score: Mutex::new(0),
            delay: Mutex::new(None),
            fail: Mutex::new(false),
            validate_calls: AtomicUsize::new(0),
            reports: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedFraudService {
    pub fn reject_with_score(&self, score: u8) {
        *self.is_safe.lock().unwrap() = false;
        *self.risk_score.lock().unwrap() = score;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<(Uuid, String)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl FraudService for ScriptedFraudService {
    async fn evaluate_risk(&self, _account_id: &str, _amount: Decimal) -> anyhow::Result<u8> {
        Ok(*self.risk_score.lock().unwrap())
    }

    async fn is_blacklisted(&self, _account_id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn validate_transfer(
        &self,
        _request: &transfer_saga::TransferRequest,
    ) -> anyhow::Result<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            anyhow::bail!("risk engine unavailable");
        }
        Ok(*self.is_safe.lock().unwrap())
    }

    async fn report_suspicious(&self, correlation_id: Uuid, reason: &str) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push((correlation_id, reason.to_string()));
        Ok(())
    }
}

// =========================================================================
// Notifications
// =========================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pushes: Mutex<Vec<(String, String, String)>>,
    emails: Mutex<Vec<(String, String, String)>>,
    completed: AtomicUsize,
    fail_push: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn set_fail_push(&self, fail: bool) {
        *self.fail_push.lock().unwrap() = fail;
    }

    pub fn pushes(&self) -> Vec<(String, String, String)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<(String, String, String)> {
        self.emails.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn push_notify(&self, account_id: &str, title: &str, body: &str) -> anyhow::Result<bool> {
        if *self.fail_push.lock().unwrap() {
            anyhow::bail!("push gateway down");
        }
        self.pushes
            .lock()
            .unwrap()
            .push((account_id.to_string(), title.to_string(), body.to_string()));
        Ok(true)
    }

    async fn send_email(&self, address: &str, subject: &str, body: &str) -> anyhow::Result<bool> {
        self.emails
            .lock()
            .unwrap()
            .push((address.to_string(), subject.to_string(), body.to_string()));
        Ok(true)
    }

    async fn notify_completed(&self, _transaction: &Transaction) -> anyhow::Result<()> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Harness
// =========================================================================

pub struct Harness {
    pub accounts: Arc<FlakyAccountStore>,
    pub transactions: Arc<FlakyTransactionStore>,
    pub fraud: Arc<ScriptedFraudService>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<InMemoryAuditLog>,
    pub orchestrator: TransferOrchestrator,
}

impl Harness {
    /// Source and target accounts, both active
    pub fn new(source_balance: Decimal, target_balance: Decimal) -> Self {
        Self::with_settings(source_balance, target_balance, OrchestratorSettings::default())
    }

    pub fn with_settings(
        source_balance: Decimal,
        target_balance: Decimal,
        settings: OrchestratorSettings,
    ) -> Self {
        let accounts = Arc::new(FlakyAccountStore::default());
        accounts.inner.insert(account(SOURCE, source_balance));
        accounts.inner.insert(account(TARGET, target_balance));

        let transactions = Arc::new(FlakyTransactionStore::default());
        let fraud = Arc::new(ScriptedFraudService::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let audit = Arc::new(InMemoryAuditLog::new());

        let orchestrator = TransferOrchestrator::new(
            accounts.clone(),
            transactions.clone(),
            fraud.clone(),
            notifier.clone(),
            audit.clone(),
            settings,
        );

        Self {
            accounts,
            transactions,
            fraud,
            notifier,
            audit,
            orchestrator,
        }
    }

    pub fn set_status(&self, number: &str, status: AccountStatus) {
        let account = self.accounts.inner.get(number).unwrap().with_status(status);
        self.accounts.inner.insert(account);
    }

    pub fn balance(&self, number: &str) -> Decimal {
        self.accounts.balance(number)
    }

    /// Actions of every audit entry, in order
    pub fn audit_actions(&self) -> Vec<String> {
        self.audit.entries().into_iter().map(|e| e.action).collect()
    }

    /// Error codes of every failure entry, in order
    pub fn audit_failure_codes(&self) -> Vec<String> {
        self.audit
            .entries_with_action("operation.failure")
            .into_iter()
            .filter_map(|e| e.details["error_code"].as_str().map(str::to_string))
            .collect()
    }
}
