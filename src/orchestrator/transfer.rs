//! Single transfer saga
//!
//! ```text
//! Validating → AccountsResolved → Locked → FraudChecked → Debited → Credited → Persisted → Notified
//!                                                               └────────┴──→ RolledBack
//! ```
//!
//! Both accounts are locked, and re-read, before any check that depends on
//! their balances. The lock wait and every step up to the debit are bounded
//! by the caller's deadline. Nothing is mutated before the fraud gate approves. From the debit until
//! the transaction record is persisted, every committed step has an entry
//! in the compensation log. The persisted transaction is the commit point.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use super::compensation::{CompensatingAction, CompensationLog};
use super::TransferOrchestrator;
use crate::audit::AuditOperation;
use crate::fraud::FRAUD_CHECK_TIMEOUT;
use crate::domain::{
    Account, AccountSide, BankingError, OperationContext, Transaction, TransactionStatus,
    TransferReceipt, TransferRequest, TransferResult,
};

const DEFAULT_DESCRIPTION: &str = "Transfer";
const CONFIRMATION_PREFIX: &str = "TRF-";
const CONFIRMATION_LEN: usize = 12;

/// Failure inside the mutating part of the saga
#[derive(Debug)]
enum StepError {
    Domain(BankingError),
    Infrastructure(anyhow::Error),
}

impl From<BankingError> for StepError {
    fn from(e: BankingError) -> Self {
        StepError::Domain(e)
    }
}

impl From<anyhow::Error> for StepError {
    fn from(e: anyhow::Error) -> Self {
        StepError::Infrastructure(e)
    }
}

impl StepError {
    fn audit_code(&self) -> &'static str {
        match self {
            StepError::Domain(e) => e.code(),
            StepError::Infrastructure(_) => "UNEXPECTED_ERROR",
        }
    }

    fn into_banking(self) -> BankingError {
        match self {
            StepError::Domain(e) => e,
            StepError::Infrastructure(source) => BankingError::Unexpected {
                code: "TRANSFER_FAILED",
                message: format!("Unexpected error during transfer: {}", source),
                source,
            },
        }
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepError::Domain(e) => write!(f, "{}", e),
            StepError::Infrastructure(e) => write!(f, "{}", e),
        }
    }
}

/// Balances written by a committed attempt
struct Committed {
    transaction: Transaction,
    source_before: Decimal,
    target_before: Decimal,
    source: Account,
    target: Account,
}

impl TransferOrchestrator {
    /// Execute a transfer with no deadline
    pub async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferResult, BankingError> {
        self.execute_transfer_with_context(request, &OperationContext::new())
            .await
    }

    /// Execute a transfer bounded by the caller's context
    ///
    /// A fraud rejection is `Ok(TransferResult::Failure)`. Every other refusal
    /// is an `Err` carrying its machine code.
    #[tracing::instrument(
        skip(self, request, context),
        fields(
            source = %request.source_account_number,
            target = %request.target_account_number,
            amount = %request.amount,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute_transfer_with_context(
        &self,
        request: &TransferRequest,
        context: &OperationContext,
    ) -> Result<TransferResult, BankingError> {
        self.run_transfer(request, context, None).await
    }

    /// Run the saga. When `record` is given, that transaction becomes the
    /// persisted record of the transfer instead of a fresh one.
    pub(super) async fn run_transfer(
        &self,
        request: &TransferRequest,
        context: &OperationContext,
        record: Option<Transaction>,
    ) -> Result<TransferResult, BankingError> {
        let amount = request.validate()?;

        // Unknown accounts never reach the lock table
        self.resolve(&request.source_account_number, AccountSide::Source)
            .await?;
        self.resolve(&request.target_account_number, AccountSide::Target)
            .await?;

        let keys = [
            request.source_account_number.as_str(),
            request.target_account_number.as_str(),
        ];
        let _guard = match context.remaining() {
            Some(left) => tokio::time::timeout(left, self.account_locks.acquire(&keys))
                .await
                .map_err(|_| deadline_exceeded())?,
            None => self.account_locks.acquire(&keys).await,
        };

        // Fresh balances under the lock
        let source = self
            .resolve(&request.source_account_number, AccountSide::Source)
            .await?;
        let target = self
            .resolve(&request.target_account_number, AccountSide::Target)
            .await?;

        if source.account_number == target.account_number {
            return Err(BankingError::not_allowed(
                "Cannot transfer to the same account",
            ));
        }

        if !self.validator.can_operate(Some(&source))? {
            return Err(BankingError::NotAllowed {
                code: source.status.refusal_code(),
                message: "Source account cannot perform operations".to_string(),
            });
        }
        if !self.validator.can_operate(Some(&target))? {
            return Err(BankingError::NotAllowed {
                code: target.status.refusal_code(),
                message: "Target account cannot receive transfers".to_string(),
            });
        }

        let fee = request.category.fee_for(&amount);
        let total_debit = amount.value() + fee;
        if source.balance < total_debit {
            return Err(BankingError::insufficient_funds(source.balance, total_debit));
        }

        let limit = request.category.max_amount();
        if amount.value() > limit {
            return Err(BankingError::limit_exceeded(
                request.category.name(),
                limit,
                amount.value(),
            ));
        }

        if context.is_expired() {
            return Err(deadline_exceeded());
        }

        let verdict = self.fraud_gate.check(request, context).await?;
        if !verdict.approved {
            // A wait cut short by the caller's deadline is not a fraud verdict
            if verdict.reject_code == Some(FRAUD_CHECK_TIMEOUT) && context.is_expired() {
                return Err(deadline_exceeded());
            }
            return Ok(TransferResult::failure(
                verdict.reject_code.unwrap_or("FRAUD_DETECTED"),
                verdict.reject_reason.unwrap_or_default(),
            ));
        }

        if context.is_expired() {
            return Err(deadline_exceeded());
        }

        let audit_id = self
            .audit
            .start_operation(
                AuditOperation::Transfer,
                &request.source_account_number,
                json!({
                    "source_account": request.source_account_number,
                    "target_account": request.target_account_number,
                    "amount": amount.value().to_string(),
                    "category": request.category.name(),
                    "fraud_risk_score": verdict.risk_score,
                }),
            )
            .await
            .map_err(|e| StepError::from(e).into_banking())?;

        let mut undo = CompensationLog::new();
        let committed = match self
            .commit(request, record, source, target, total_debit, &mut undo)
            .await
        {
            Ok(committed) => committed,
            Err(e) => {
                tracing::warn!(%audit_id, code = e.audit_code(), error = %e, "Transfer failed");
                if !undo.is_empty() {
                    self.compensate(
                        undo,
                        &request.source_account_number,
                        &request.target_account_number,
                        &e,
                    )
                    .await;
                }
                if let Err(audit_err) = self
                    .audit
                    .log_failure(audit_id, e.audit_code(), &e.to_string())
                    .await
                {
                    tracing::error!(%audit_id, error = %audit_err, "Failed to audit transfer failure");
                }
                return Err(e.into_banking());
            }
        };

        let transaction_id = committed.transaction.transaction_id;
        self.audit_committed(audit_id, &committed).await;
        self.notify_parties(audit_id, request, &committed).await;

        tracing::info!(
            %transaction_id,
            %audit_id,
            fee = %fee,
            "Transfer completed"
        );

        Ok(TransferResult::Success(TransferReceipt {
            transaction_id,
            confirmation_code: confirmation_code(),
            transferred_amount: amount.value(),
            fee,
            source_balance: committed.source.balance,
            target_balance: committed.target.balance,
            processed_at: committed.transaction.processed_at.unwrap_or_else(Utc::now),
        }))
    }

    /// Debit, credit and persist. Each account write pushes its undo action.
    async fn commit(
        &self,
        request: &TransferRequest,
        record: Option<Transaction>,
        mut source: Account,
        mut target: Account,
        total_debit: Decimal,
        undo: &mut CompensationLog,
    ) -> Result<Committed, StepError> {
        let source_snapshot = source.clone();
        source.debit(total_debit);
        let source = self.accounts.save(source).await?;
        undo.push(CompensatingAction::RestoreAccount {
            side: AccountSide::Source,
            snapshot: source_snapshot.clone(),
        });

        let target_snapshot = target.clone();
        target.credit(request.amount);
        let target = self.accounts.save(target).await?;
        undo.push(CompensatingAction::RestoreAccount {
            side: AccountSide::Target,
            snapshot: target_snapshot.clone(),
        });

        let mut transaction = record.unwrap_or_else(|| {
            Transaction::transfer(
                &request.source_account_number,
                &request.target_account_number,
                request.amount,
                request
                    .description
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            )
        });
        transaction.category = Some(request.category);
        transaction.transition_to(TransactionStatus::Completed)?;
        let transaction = self.transactions.save(transaction).await?;

        Ok(Committed {
            transaction,
            source_before: source_snapshot.balance,
            target_before: target_snapshot.balance,
            source,
            target,
        })
    }

    /// Undo committed steps. Never fails: problems are audited, logged and
    /// escalated to operations, and the caller keeps the original error.
    async fn compensate(&self, undo: CompensationLog, source_id: &str, target_id: &str, cause: &StepError) {
        let rollback_id = match self
            .audit
            .start_operation(
                AuditOperation::Rollback,
                source_id,
                json!({
                    "reason": "Transfer failed, executing compensation",
                    "cause": cause.to_string(),
                    "steps": undo.len(),
                }),
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(error = %e, "Failed to audit rollback start");
                None
            }
        };

        let failures = undo.unwind(self.accounts.as_ref()).await;

        if failures.is_empty() {
            tracing::info!(source = source_id, target = target_id, "Rollback completed");
            if let Some(id) = rollback_id {
                if let Err(e) = self.audit.log_success(id, "ROLLBACK_COMPLETED").await {
                    tracing::warn!(rollback_id = %id, error = %e, "Failed to audit rollback success");
                }
            }
            return;
        }

        let message = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        tracing::error!(
            source = source_id,
            target = target_id,
            error = %message,
            "Rollback failed, balances may be inconsistent"
        );

        if let Some(id) = rollback_id {
            if let Err(e) = self.audit.log_failure(id, "ROLLBACK_FAILED", &message).await {
                tracing::error!(rollback_id = %id, error = %e, "Failed to audit rollback failure");
            }
        }

        let body = format!(
            "Transfer failed with incomplete rollback. Source account: {}, Target account: {}. Errors: {}",
            source_id, target_id, message
        );
        match self
            .notifications
            .send_email(
                &self.settings.operations_alert_email,
                "CRITICAL ALERT: Rollback failed",
                &body,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::error!("Operations alert for failed rollback was not delivered"),
            Err(e) => tracing::error!(error = %e, "Failed to send operations alert for failed rollback"),
        }
    }

    /// Post-commit audit entries. Failures here cannot undo a committed transfer.
    async fn audit_committed(&self, audit_id: Uuid, committed: &Committed) {
        let transaction_id = committed.transaction.transaction_id;
        let changes = [
            (&committed.source, committed.source_before),
            (&committed.target, committed.target_before),
        ];
        for (account, before) in changes {
            if let Err(e) = self
                .audit
                .log_balance_change(&account.account_number, before, account.balance, transaction_id)
                .await
            {
                tracing::warn!(
                    %audit_id,
                    account = %account.account_number,
                    error = %e,
                    "Failed to audit balance change"
                );
            }
        }

        if let Err(e) = self
            .audit
            .log_success(audit_id, &transaction_id.to_string())
            .await
        {
            tracing::warn!(%audit_id, error = %e, "Failed to audit transfer success");
        }
    }

    /// Best-effort notices to both parties
    async fn notify_parties(&self, audit_id: Uuid, request: &TransferRequest, committed: &Committed) {
        let source = &committed.source.account_number;
        let target = &committed.target.account_number;

        let outcome: anyhow::Result<()> = async {
            let notices = [
                (
                    source,
                    "Transfer sent",
                    format!("You sent {} to {}", request.amount, target),
                ),
                (
                    target,
                    "Transfer received",
                    format!("You received {} from {}", request.amount, source),
                ),
            ];
            for (account, title, body) in &notices {
                if !self.notifications.push_notify(account, title, body).await? {
                    tracing::warn!(account = %account, title, "Push notification not delivered");
                }
            }
            self.notifications
                .notify_completed(&committed.transaction)
                .await
        }
        .await;

        if let Err(e) = outcome {
            tracing::warn!(%audit_id, error = %e, "Transfer notification failed");
            if let Err(audit_err) = self
                .audit
                .log_failure(audit_id, "NOTIFICATION_FAILED", &e.to_string())
                .await
            {
                tracing::warn!(%audit_id, error = %audit_err, "Failed to audit notification failure");
            }
        }
    }
}

fn deadline_exceeded() -> BankingError {
    BankingError::banking(
        "DEADLINE_EXCEEDED",
        "Transfer deadline expired before funds were moved",
    )
}

/// Caller-facing receipt code, e.g. `TRF-8K2M0QZ7XW4A`
fn confirmation_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", CONFIRMATION_PREFIX, suffix.to_uppercase())
}
