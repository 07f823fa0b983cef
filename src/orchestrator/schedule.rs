//! Scheduled transfers
//!
//! A scheduled transfer is a Pending placeholder transaction carrying
//! `scheduled_for`. Accounts are only checked for existence when
//! scheduling; operability is checked by the saga when the placeholder
//! is executed. On success the placeholder itself becomes the Completed
//! record of the transfer.
//!
//! Cancelling and claiming a placeholder for execution both happen under
//! its lock, so each sees the other's status change.

use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use super::{unexpected, TransferOrchestrator};
use crate::domain::{
    AccountSide, BankingError, OperationContext, Transaction, TransactionStatus, TransferRequest,
    TransferResult,
};

/// Report from one pass over due scheduled transfers
#[derive(Debug, Clone, Default)]
pub struct ScheduledRunReport {
    pub due: usize,
    /// Placeholders that became completed transfers
    pub completed: Vec<Uuid>,
    /// Placeholder id and the failure code
    pub failed: Vec<(Uuid, String)>,
    /// Placeholders no longer Pending when their turn came, e.g. cancelled
    pub skipped: Vec<Uuid>,
    pub errors: Vec<String>,
}

impl TransferOrchestrator {
    /// Persist a Pending placeholder to be executed at `when`
    pub async fn schedule_transfer(
        &self,
        request: &TransferRequest,
        when: DateTime<Utc>,
    ) -> Result<Uuid, BankingError> {
        request.validate()?;

        let now = Utc::now();
        if when <= now {
            return Err(BankingError::InvalidArgument(
                "The scheduled time must be in the future".to_string(),
            ));
        }

        let months = self.settings.schedule_horizon_months;
        let horizon = now.checked_add_months(Months::new(months)).ok_or_else(|| {
            BankingError::InvalidArgument("Scheduling horizon is out of range".to_string())
        })?;
        if when > horizon {
            return Err(BankingError::InvalidArgument(format!(
                "Transfers cannot be scheduled more than {} months ahead",
                months
            )));
        }

        self.resolve(&request.source_account_number, AccountSide::Source)
            .await?;
        self.resolve(&request.target_account_number, AccountSide::Target)
            .await?;

        let mut placeholder = Transaction::transfer(
            &request.source_account_number,
            &request.target_account_number,
            request.amount,
            format!(
                "Scheduled transfer: {}",
                request.description.as_deref().unwrap_or("Transfer")
            ),
        );
        placeholder.category = Some(request.category);
        placeholder.scheduled_for = Some(when);

        let saved = self
            .transactions
            .save(placeholder)
            .await
            .map_err(|e| unexpected("SCHEDULE_FAILED", "Could not persist scheduled transfer", e))?;

        tracing::info!(
            scheduled_id = %saved.transaction_id,
            scheduled_for = %when,
            "Transfer scheduled"
        );

        Ok(saved.transaction_id)
    }

    /// Cancel a Pending scheduled transfer
    pub async fn cancel_scheduled(&self, scheduled_id: Uuid) -> Result<Transaction, BankingError> {
        let key = scheduled_id.to_string();
        let _guard = self.schedule_locks.acquire(&[key.as_str()]).await;

        let mut transaction = self
            .transactions
            .find_by_id(scheduled_id)
            .await
            .map_err(|e| unexpected("CANCEL_FAILED", "Could not load scheduled transfer", e))?
            .ok_or_else(|| {
                BankingError::banking(
                    "SCHEDULED_NOT_FOUND",
                    format!("Scheduled transfer not found: {}", scheduled_id),
                )
            })?;

        if transaction.status != TransactionStatus::Pending {
            return Err(BankingError::not_allowed(
                "Only pending transfers can be cancelled",
            ));
        }

        transaction.transition_to(TransactionStatus::Cancelled)?;
        let saved = self
            .transactions
            .save(transaction)
            .await
            .map_err(|e| unexpected("CANCEL_FAILED", "Could not persist cancellation", e))?;

        tracing::info!(%scheduled_id, "Scheduled transfer cancelled");
        Ok(saved)
    }

    /// Execute every Pending placeholder due at `now`, oldest schedule first
    pub async fn execute_due_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ScheduledRunReport, BankingError> {
        let mut due: Vec<Transaction> = self
            .transactions
            .find_by_status(TransactionStatus::Pending)
            .await
            .map_err(|e| unexpected("SCHEDULER_FAILED", "Could not load pending transfers", e))?
            .into_iter()
            .filter(|tx| tx.is_due(now))
            .collect();
        due.sort_by_key(|tx| tx.scheduled_for);

        let mut report = ScheduledRunReport {
            due: due.len(),
            ..Default::default()
        };

        for placeholder_id in due.into_iter().map(|tx| tx.transaction_id) {
            if let Err(e) = self.execute_placeholder(placeholder_id, &mut report).await {
                tracing::error!(%placeholder_id, error = %e, "Scheduled transfer could not be processed");
                report.errors.push(format!("{}: {}", placeholder_id, e));
            }
        }

        Ok(report)
    }

    async fn execute_placeholder(
        &self,
        placeholder_id: Uuid,
        report: &mut ScheduledRunReport,
    ) -> Result<(), BankingError> {
        let Some(mut placeholder) = self.claim(placeholder_id).await? else {
            tracing::info!(%placeholder_id, "Scheduled transfer no longer pending, skipped");
            report.skipped.push(placeholder_id);
            return Ok(());
        };

        let (Some(source), Some(target)) = (
            placeholder.source_account_number.clone(),
            placeholder.target_account_number.clone(),
        ) else {
            placeholder.transition_to(TransactionStatus::Failed)?;
            self.transactions
                .save(placeholder)
                .await
                .map_err(|e| unexpected("SCHEDULER_FAILED", "Could not record scheduled outcome", e))?;
            return Err(BankingError::banking(
                "INVALID_SCHEDULED_TRANSFER",
                "Scheduled transfer is missing an account",
            ));
        };

        let request = TransferRequest {
            source_account_number: source,
            target_account_number: target,
            amount: placeholder.amount,
            category: placeholder.category.unwrap_or_default(),
            description: Some(placeholder.description.clone()),
        };

        let outcome = match self
            .run_transfer(&request, &OperationContext::new(), Some(placeholder.clone()))
            .await
        {
            Ok(result) => result,
            Err(e) => TransferResult::from_error(&e),
        };

        match &outcome {
            TransferResult::Success(receipt) => {
                report.completed.push(placeholder_id);
                tracing::info!(
                    %placeholder_id,
                    transaction_id = %receipt.transaction_id,
                    "Scheduled transfer executed"
                );
                Ok(())
            }
            TransferResult::Failure {
                error_code,
                message,
            } => {
                placeholder.transition_to(TransactionStatus::Failed)?;
                self.transactions
                    .save(placeholder)
                    .await
                    .map_err(|e| unexpected("SCHEDULER_FAILED", "Could not record scheduled outcome", e))?;
                report.failed.push((placeholder_id, error_code.clone()));
                tracing::warn!(
                    %placeholder_id,
                    code = %error_code,
                    message = %message,
                    "Scheduled transfer failed"
                );
                Ok(())
            }
        }
    }

    /// Re-read a placeholder under its lock and move it to Processing if it
    /// is still Pending. `None` when it was cancelled or already claimed.
    async fn claim(&self, placeholder_id: Uuid) -> Result<Option<Transaction>, BankingError> {
        let key = placeholder_id.to_string();
        let _guard = self.schedule_locks.acquire(&[key.as_str()]).await;

        let current = self
            .transactions
            .find_by_id(placeholder_id)
            .await
            .map_err(|e| unexpected("SCHEDULER_FAILED", "Could not load scheduled transfer", e))?;
        let Some(mut placeholder) = current.filter(|tx| tx.status == TransactionStatus::Pending) else {
            return Ok(None);
        };

        placeholder.transition_to(TransactionStatus::Processing)?;
        let placeholder = self
            .transactions
            .save(placeholder)
            .await
            .map_err(|e| unexpected("SCHEDULER_FAILED", "Could not mark transfer processing", e))?;
        Ok(Some(placeholder))
    }
}
