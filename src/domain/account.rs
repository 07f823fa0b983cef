//! Account record
//!
//! Accounts are owned by the account store. The orchestrator works on a
//! mutable snapshot and writes it back through `AccountStore::save`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Blocked,
    Closed,
    PendingVerification,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Blocked => "BLOCKED",
            AccountStatus::Closed => "CLOSED",
            AccountStatus::PendingVerification => "PENDING_VERIFICATION",
        }
    }

    /// Machine code used when a transfer is refused because of this status
    pub fn refusal_code(&self) -> Option<&'static str> {
        match self {
            AccountStatus::Active => None,
            AccountStatus::Inactive => Some("ACCOUNT_INACTIVE"),
            AccountStatus::Blocked => Some("ACCOUNT_BLOCKED"),
            AccountStatus::Closed => Some("ACCOUNT_CLOSED"),
            AccountStatus::PendingVerification => Some("ACCOUNT_PENDING_VERIFICATION"),
        }
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account product type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
    Business,
    Premium,
}

impl AccountType {
    pub fn description(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings account",
            AccountType::Checking => "Checking account",
            AccountType::Business => "Business account",
            AccountType::Premium => "Premium account",
        }
    }
}

/// Which party of a transfer an account plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSide {
    Source,
    Target,
}

impl fmt::Display for AccountSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountSide::Source => f.write_str("Source"),
            AccountSide::Target => f.write_str("Target"),
        }
    }
}

/// Bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account number, the immutable business key
    pub account_number: String,
    pub owner_name: String,
    pub owner_id: String,
    pub balance: Decimal,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create an active account
    pub fn new(
        account_number: impl Into<String>,
        owner_name: impl Into<String>,
        owner_id: impl Into<String>,
        balance: Decimal,
        account_type: AccountType,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            owner_name: owner_name.into(),
            owner_id: owner_id.into(),
            balance,
            account_type,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            last_transaction_at: None,
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Subtract from the balance and stamp the movement time
    pub fn debit(&mut self, total: Decimal) {
        self.balance -= total;
        self.last_transaction_at = Some(Utc::now());
    }

    /// Add to the balance and stamp the movement time
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.last_transaction_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_new_is_active() {
        let account = Account::new("1234567899", "Ander", "CC1234567", dec!(2000), AccountType::Savings);

        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.last_transaction_at.is_none());
    }

    #[test]
    fn test_debit_and_credit() {
        let mut account = Account::new("1234567899", "Ander", "CC1234567", dec!(2000), AccountType::Savings);

        account.debit(dec!(1500));
        assert_eq!(account.balance, dec!(500));
        assert!(account.last_transaction_at.is_some());

        account.credit(dec!(250.50));
        assert_eq!(account.balance, dec!(750.50));
    }

    #[test]
    fn test_refusal_codes() {
        assert_eq!(AccountStatus::Active.refusal_code(), None);
        assert_eq!(AccountStatus::Blocked.refusal_code(), Some("ACCOUNT_BLOCKED"));
        assert_eq!(AccountStatus::Closed.to_string(), "CLOSED");
    }

    #[test]
    fn test_status_serde_format() {
        let json = serde_json::to_string(&AccountStatus::PendingVerification).unwrap();
        assert_eq!(json, "\"PENDING_VERIFICATION\"");
    }
}
