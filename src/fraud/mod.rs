//! Fraud module
//!
//! `FraudService` is the external risk-scoring capability. `FraudGate` wraps
//! it with a bounded wait and turns its answers into a `FraudVerdict`.
//! A timeout is a rejection, never an approval.

mod rules;

pub use rules::{RuleBasedFraudService, SuspiciousReport, HIGH_RISK_THRESHOLD, SUSPICIOUS_AMOUNT};

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{BankingError, OperationContext, TransferRequest};

/// Default wait for the risk-validation call
pub const DEFAULT_FRAUD_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Risk score recorded when no score could be measured
pub const UNKNOWN_RISK_SCORE: i32 = -1;

/// Reject code of a validation that did not answer in time
pub const FRAUD_CHECK_TIMEOUT: &str = "FRAUD_CHECK_TIMEOUT";

/// External fraud detection capability
#[async_trait]
pub trait FraudService: Send + Sync {
    /// Risk score in `0..=100` for a debit of `amount` from `account_id`
    async fn evaluate_risk(&self, account_id: &str, amount: Decimal) -> anyhow::Result<u8>;

    async fn is_blacklisted(&self, account_id: &str) -> anyhow::Result<bool>;

    /// `true` when the transfer looks safe
    async fn validate_transfer(&self, request: &TransferRequest) -> anyhow::Result<bool>;

    /// Report a rejected attempt upstream under a fresh correlation id
    async fn report_suspicious(&self, correlation_id: Uuid, reason: &str) -> anyhow::Result<()>;
}

/// Outcome of a fraud check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudVerdict {
    pub approved: bool,
    pub reject_code: Option<&'static str>,
    pub reject_reason: Option<String>,
    pub risk_score: i32,
}

impl FraudVerdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            reject_code: None,
            reject_reason: None,
            risk_score: 0,
        }
    }

    pub fn detected(risk_score: u8) -> Self {
        Self {
            approved: false,
            reject_code: Some("FRAUD_DETECTED"),
            reject_reason: Some("The transfer was rejected by security policy".to_string()),
            risk_score: i32::from(risk_score),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            approved: false,
            reject_code: Some(FRAUD_CHECK_TIMEOUT),
            reject_reason: Some("The validation service did not respond in time".to_string()),
            risk_score: UNKNOWN_RISK_SCORE,
        }
    }
}

/// Bounded-time checkpoint in front of a `FraudService`
#[derive(Clone)]
pub struct FraudGate {
    service: Arc<dyn FraudService>,
    timeout: Duration,
}

impl FraudGate {
    pub fn new(service: Arc<dyn FraudService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the risk validation, waiting at most the gate timeout or the time
    /// left in `context`, whichever is shorter.
    ///
    /// Only a failure of the underlying service is an `Err`; rejections and
    /// timeouts come back as a non-approved verdict.
    pub async fn check(
        &self,
        request: &TransferRequest,
        context: &OperationContext,
    ) -> Result<FraudVerdict, BankingError> {
        let wait = context.bounded(self.timeout);

        let is_safe = match tokio::time::timeout(wait, self.service.validate_transfer(request)).await
        {
            Ok(Ok(is_safe)) => is_safe,
            Ok(Err(e)) => return Err(check_error(e)),
            Err(_) => {
                tracing::warn!(
                    source = %request.source_account_number,
                    timeout_ms = wait.as_millis() as u64,
                    "Fraud check timed out, rejecting transfer"
                );
                return Ok(FraudVerdict::timed_out());
            }
        };

        if is_safe {
            return Ok(FraudVerdict::approved());
        }

        let score = self
            .service
            .evaluate_risk(&request.source_account_number, request.amount)
            .await
            .map_err(check_error)?;

        self.service
            .report_suspicious(
                Uuid::new_v4(),
                &format!("Transfer rejected as fraudulent. Score: {}", score),
            )
            .await
            .map_err(check_error)?;

        tracing::warn!(
            source = %request.source_account_number,
            target = %request.target_account_number,
            risk_score = score,
            "Transfer rejected by fraud check"
        );

        Ok(FraudVerdict::detected(score))
    }
}

fn check_error(source: anyhow::Error) -> BankingError {
    BankingError::Unexpected {
        code: "FRAUD_CHECK_ERROR",
        message: format!("Error while validating the transfer: {}", source),
        source,
    }
}
