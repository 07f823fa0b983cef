//! Transaction record
//!
//! Created by the orchestrator and persisted through the transaction store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::BankingError;
use super::transfer::TransferCategory;

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
}

/// Transaction lifecycle status
///
/// ```text
/// PENDING → PROCESSING → COMPLETED → REVERSED
///    │           └──────→ FAILED
///    ├─→ COMPLETED
///    ├─→ CANCELLED
///    └─→ FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Reversed => "REVERSED",
        }
    }

    /// Check whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Reversed)
        )
    }

    /// No further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Failed | TransactionStatus::Cancelled | TransactionStatus::Reversed
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Banking transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub source_account_number: Option<String>,
    pub target_account_number: Option<String>,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub description: String,
    /// Category of a transfer, needed to execute a scheduled placeholder
    #[serde(default)]
    pub category: Option<TransferCategory>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    /// When a scheduled transfer becomes due
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Related transaction, e.g. the original of a refund
    pub related_transaction_id: Option<Uuid>,
}

impl Transaction {
    /// Create a pending transaction with a fresh id
    pub fn new(transaction_type: TransactionType, amount: Decimal) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            source_account_number: None,
            target_account_number: None,
            amount,
            transaction_type,
            status: TransactionStatus::Pending,
            description: String::new(),
            category: None,
            created_at: Utc::now(),
            processed_at: None,
            scheduled_for: None,
            related_transaction_id: None,
        }
    }

    /// Create a pending transfer between two accounts
    pub fn transfer(
        source: impl Into<String>,
        target: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        let mut transaction = Self::new(TransactionType::Transfer, amount);
        transaction.source_account_number = Some(source.into());
        transaction.target_account_number = Some(target.into());
        transaction.description = description.into();
        transaction
    }

    /// Move to `next`, stamping `processed_at` when the transaction finishes processing
    pub fn transition_to(&mut self, next: TransactionStatus) -> Result<(), BankingError> {
        if !self.status.can_transition_to(next) {
            return Err(BankingError::not_allowed_with_code(
                "INVALID_STATUS_TRANSITION",
                format!(
                    "Transaction {} cannot move from {} to {}",
                    self.transaction_id, self.status, next
                ),
            ));
        }

        if matches!(next, TransactionStatus::Completed | TransactionStatus::Failed) {
            self.processed_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }

    /// Scheduled placeholder whose execution time has come
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Pending
            && self.transaction_type == TransactionType::Transfer
            && self.scheduled_for.is_some_and(|at| at <= now)
    }
}
