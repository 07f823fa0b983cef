//! Rule-based fraud service
//!
//! In-process `FraudService` used when no external risk engine is wired in.
//! Scores come from a blacklist and the size of the amount.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use super::FraudService;
use crate::domain::TransferRequest;

/// Scores at or above this are rejected
pub const HIGH_RISK_THRESHOLD: u8 = 70;

/// Amounts at or above this raise the risk score
pub const SUSPICIOUS_AMOUNT: Decimal = dec!(10000000);

const BASE_SCORE: u8 = 10;
const SUSPICIOUS_SCORE: u8 = 50;
const VERY_SUSPICIOUS_SCORE: u8 = 85;
const BLACKLISTED_SCORE: u8 = 100;

/// A suspicious activity report kept for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspiciousReport {
    pub correlation_id: Uuid,
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RuleBasedFraudService {
    blacklist: DashSet<String>,
    reports: Mutex<Vec<SuspiciousReport>>,
}

impl RuleBasedFraudService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blacklist(accounts: impl IntoIterator<Item = String>) -> Self {
        let service = Self::new();
        for account in accounts {
            service.blacklist(account);
        }
        service
    }

    pub fn blacklist(&self, account_id: impl Into<String>) {
        self.blacklist.insert(account_id.into());
    }

    pub fn reports(&self) -> Vec<SuspiciousReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn score(&self, account_id: &str, amount: Decimal) -> u8 {
        if self.blacklist.contains(account_id) {
            BLACKLISTED_SCORE
        } else if amount >= SUSPICIOUS_AMOUNT * dec!(5) {
            VERY_SUSPICIOUS_SCORE
        } else if amount >= SUSPICIOUS_AMOUNT {
            SUSPICIOUS_SCORE
        } else {
            BASE_SCORE
        }
    }
}

#[async_trait]
impl FraudService for RuleBasedFraudService {
    async fn evaluate_risk(&self, account_id: &str, amount: Decimal) -> anyhow::Result<u8> {
        Ok(self.score(account_id, amount))
    }

    async fn is_blacklisted(&self, account_id: &str) -> anyhow::Result<bool> {
        Ok(self.blacklist.contains(account_id))
    }

    async fn validate_transfer(&self, request: &TransferRequest) -> anyhow::Result<bool> {
        if self.blacklist.contains(&request.source_account_number)
            || self.blacklist.contains(&request.target_account_number)
        {
            return Ok(false);
        }
        let score = self.score(&request.source_account_number, request.amount);
        Ok(score < HIGH_RISK_THRESHOLD)
    }

    async fn report_suspicious(&self, correlation_id: Uuid, reason: &str) -> anyhow::Result<()> {
        tracing::warn!(%correlation_id, reason, "Suspicious activity reported");
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SuspiciousReport {
                correlation_id,
                reason: reason.to_string(),
                reported_at: Utc::now(),
            });
        Ok(())
    }
}
