//! Transfer request and result types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::amount::Amount;
use super::error::BankingError;

/// Percentage added on top of the fixed fee for international transfers
const INTERNATIONAL_FEE_PERCENT: Decimal = dec!(0.5);

/// Transfer category, each with its own fee and ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferCategory {
    #[default]
    SameBank,
    OtherBank,
    International,
}

impl TransferCategory {
    /// Category key used in limit errors and audit metadata
    pub fn name(&self) -> &'static str {
        match self {
            TransferCategory::SameBank => "SAME_BANK",
            TransferCategory::OtherBank => "OTHER_BANK",
            TransferCategory::International => "INTERNATIONAL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransferCategory::SameBank => "Same bank",
            TransferCategory::OtherBank => "Other bank",
            TransferCategory::International => "International",
        }
    }

    /// Fixed part of the fee
    pub fn base_fee(&self) -> Decimal {
        match self {
            TransferCategory::SameBank => Decimal::ZERO,
            TransferCategory::OtherBank => dec!(5000),
            TransferCategory::International => dec!(50000),
        }
    }

    /// Largest amount a single transfer of this category may move
    pub fn max_amount(&self) -> Decimal {
        match self {
            TransferCategory::SameBank => dec!(100000000),
            TransferCategory::OtherBank => dec!(50000000),
            TransferCategory::International => dec!(20000000),
        }
    }

    /// Fee charged to the source on top of the amount
    pub fn fee_for(&self, amount: &Amount) -> Decimal {
        match self {
            TransferCategory::International => {
                self.base_fee() + amount.percent(INTERNATIONAL_FEE_PERCENT)
            }
            _ => self.base_fee(),
        }
    }
}

impl fmt::Display for TransferCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request to move funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_account_number: String,
    pub target_account_number: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: TransferCategory,
    #[serde(default)]
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn new(
        source_account_number: impl Into<String>,
        target_account_number: impl Into<String>,
        amount: Decimal,
        category: TransferCategory,
    ) -> Self {
        Self {
            source_account_number: source_account_number.into(),
            target_account_number: target_account_number.into(),
            amount,
            category,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the request shape before any I/O and return the validated amount
    pub fn validate(&self) -> Result<Amount, BankingError> {
        if self.source_account_number.trim().is_empty() {
            return Err(BankingError::validation(
                "source_account_number",
                "Source account is required",
            ));
        }
        if self.target_account_number.trim().is_empty() {
            return Err(BankingError::validation(
                "target_account_number",
                "Target account is required",
            ));
        }
        Amount::new(self.amount).map_err(|e| BankingError::InvalidArgument(e.to_string()))
    }
}

/// Details of a completed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_id: Uuid,
    pub confirmation_code: String,
    pub transferred_amount: Decimal,
    pub fee: Decimal,
    pub source_balance: Decimal,
    pub target_balance: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// Outcome of a transfer attempt: a receipt or a coded failure, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferResult {
    Success(TransferReceipt),
    Failure { error_code: String, message: String },
}

impl TransferResult {
    pub fn failure(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure {
            error_code: error_code.into(),
            message: message.into(),
        }
    }

    /// Failure carrying the error's own code and message
    pub fn from_error(error: &BankingError) -> Self {
        Self::failure(error.code(), error.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn receipt(&self) -> Option<&TransferReceipt> {
        match self {
            Self::Success(receipt) => Some(receipt),
            Self::Failure { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error_code, .. } => Some(error_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransferCategory::SameBank, dec!(1000), dec!(0))]
    #[case(TransferCategory::OtherBank, dec!(1000), dec!(5000))]
    #[case(TransferCategory::International, dec!(1000000), dec!(55000))]
    #[case(TransferCategory::International, dec!(1), dec!(50000.005))]
    fn test_fee_for(#[case] category: TransferCategory, #[case] amount: Decimal, #[case] fee: Decimal) {
        let amount = Amount::new(amount).unwrap();
        assert_eq!(category.fee_for(&amount), fee);
    }

    #[test]
    fn test_category_limits() {
        assert_eq!(TransferCategory::SameBank.max_amount(), dec!(100000000));
        assert_eq!(TransferCategory::OtherBank.max_amount(), dec!(50000000));
        assert_eq!(TransferCategory::International.max_amount(), dec!(20000000));
        assert_eq!(TransferCategory::default(), TransferCategory::SameBank);
    }

    #[rstest]
    #[case("", "1234567897", dec!(10), "VALIDATION_ERROR")]
    #[case("1234567899", "   ", dec!(10), "VALIDATION_ERROR")]
    #[case("1234567899", "1234567897", dec!(0), "INVALID_ARGUMENT")]
    #[case("1234567899", "1234567897", dec!(-5), "INVALID_ARGUMENT")]
    fn test_validate_rejects(
        #[case] source: &str,
        #[case] target: &str,
        #[case] amount: Decimal,
        #[case] code: &str,
    ) {
        let request = TransferRequest::new(source, target, amount, TransferCategory::SameBank);
        assert_eq!(request.validate().unwrap_err().code(), code);
    }

    #[test]
    fn test_validate_names_field() {
        let request = TransferRequest::new("1234567899", "", dec!(10), TransferCategory::SameBank);
        match request.validate() {
            Err(BankingError::Validation { field, .. }) => assert_eq!(field, "target_account_number"),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_result_serialization() {
        let result = TransferResult::failure("FRAUD_DETECTED", "Rejected by security policy");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["error_code"], "FRAUD_DETECTED");
        assert!(result.receipt().is_none());
    }

    #[test]
    fn test_request_category_defaults_to_same_bank() {
        let request: TransferRequest = serde_json::from_str(
            r#"{"source_account_number":"1234567899","target_account_number":"1234567897","amount":"1000"}"#,
        )
        .unwrap();

        assert_eq!(request.category, TransferCategory::SameBank);
        assert_eq!(request.amount, dec!(1000));
    }
}
