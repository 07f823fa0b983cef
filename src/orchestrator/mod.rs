//! Transfer Orchestrator
//!
//! Stateless saga coordinator over the collaborator ports. It moves money
//! between two independently stored accounts and hand-rolls atomicity with
//! a compensation log.
//!
//! | Operation                | File          |
//! |--------------------------|---------------|
//! | single transfer          | `transfer.rs` |
//! | batch                    | `batch.rs`    |
//! | schedule / cancel / run  | `schedule.rs` |

mod batch;
pub mod compensation;
pub mod locks;
mod schedule;
mod transfer;

pub use compensation::{CompensatingAction, CompensationFailure, CompensationLog};
pub use locks::{KeyedGuard, KeyedLocks};
pub use schedule::ScheduledRunReport;

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::AuditService;
use crate::domain::{
    Account, AccountSide, AccountValidator, Amount, BankingError, TransactionStatus,
    TransferCategory,
};
use crate::fraud::{FraudGate, FraudService, DEFAULT_FRAUD_CHECK_TIMEOUT};
use crate::notification::NotificationService;
use crate::store::{AccountStore, TransactionStore};

/// Tunables of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound on the fraud risk-validation call
    pub fraud_check_timeout: Duration,
    /// Largest accepted batch
    pub batch_max_size: usize,
    /// Batch items in flight at once; 1 runs them sequentially
    pub batch_concurrency: usize,
    /// How far ahead a transfer may be scheduled
    pub schedule_horizon_months: u32,
    /// Recipient of operational alerts such as failed rollbacks
    pub operations_alert_email: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            fraud_check_timeout: DEFAULT_FRAUD_CHECK_TIMEOUT,
            batch_max_size: 100,
            batch_concurrency: 1,
            schedule_horizon_months: 6,
            operations_alert_email: "operations@bank.com".to_string(),
        }
    }
}

/// Saga coordinator for transfers
#[derive(Clone)]
pub struct TransferOrchestrator {
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionStore>,
    fraud_gate: FraudGate,
    notifications: Arc<dyn NotificationService>,
    audit: Arc<dyn AuditService>,
    validator: AccountValidator,
    /// Serialises attempts touching the same account
    account_locks: KeyedLocks,
    /// Serialises cancel and execution of the same scheduled transfer
    schedule_locks: KeyedLocks,
    settings: OrchestratorSettings,
}

impl TransferOrchestrator {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn TransactionStore>,
        fraud: Arc<dyn FraudService>,
        notifications: Arc<dyn NotificationService>,
        audit: Arc<dyn AuditService>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            accounts,
            transactions,
            fraud_gate: FraudGate::new(fraud, settings.fraud_check_timeout),
            notifications,
            audit,
            validator: AccountValidator::new(),
            account_locks: KeyedLocks::new(),
            schedule_locks: KeyedLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Fee charged on top of `amount` for a transfer of `category`
    pub fn estimate_fee(
        &self,
        amount: Decimal,
        category: TransferCategory,
    ) -> Result<Decimal, BankingError> {
        let amount = Amount::new(amount).map_err(|e| BankingError::InvalidArgument(e.to_string()))?;
        Ok(category.fee_for(&amount))
    }

    /// Current status of a transaction
    pub async fn transfer_status(&self, transfer_id: Uuid) -> Result<TransactionStatus, BankingError> {
        let transaction = self
            .transactions
            .find_by_id(transfer_id)
            .await
            .map_err(|e| unexpected("TRANSFER_STATUS_FAILED", "Could not load transfer", e))?;

        transaction
            .map(|tx| tx.status)
            .ok_or_else(|| {
                BankingError::banking(
                    "TRANSFER_NOT_FOUND",
                    format!("Transfer not found: {}", transfer_id),
                )
            })
    }

    /// Load one side of a transfer
    async fn resolve(&self, account_number: &str, side: AccountSide) -> Result<Account, BankingError> {
        self.accounts
            .find_by_number(account_number)
            .await
            .map_err(|e| unexpected("ACCOUNT_LOOKUP_FAILED", "Could not load account", e))?
            .ok_or_else(|| BankingError::AccountNotFound {
                side,
                account_id: account_number.to_string(),
            })
    }
}

/// Wrap an infrastructure failure into a coded banking error
fn unexpected(code: &'static str, context: &str, source: anyhow::Error) -> BankingError {
    BankingError::Unexpected {
        code,
        message: format!("{}: {}", context, source),
        source,
    }
}
