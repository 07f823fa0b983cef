//! Account Validator
//!
//! Stateless rule checks on account identity and status. No I/O.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::account::{Account, AccountStatus, AccountType};
use super::error::BankingError;

const MIN_ACCOUNT_NUMBER_LEN: usize = 10;
const MAX_ACCOUNT_NUMBER_LEN: usize = 16;
const MIN_OWNER_NAME_LEN: usize = 3;
const MAX_OWNER_NAME_LEN: usize = 100;
const MINIMUM_OPENING_BALANCE: Decimal = dec!(50000);
const MAXIMUM_INITIAL_BALANCE: Decimal = dec!(500000000);

/// Account rule checks
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountValidator;

impl AccountValidator {
    pub fn new() -> Self {
        Self
    }

    /// True iff the account is `Active`. A missing account is a validation error.
    pub fn can_operate(&self, account: Option<&Account>) -> Result<bool, BankingError> {
        let account =
            account.ok_or_else(|| BankingError::validation("account", "Account must be provided"))?;
        Ok(account.status == AccountStatus::Active)
    }

    /// Account numbers are 10 to 16 ASCII digits
    pub fn is_valid_account_number(&self, account_number: &str) -> Result<bool, BankingError> {
        if account_number.trim().is_empty() {
            return Err(BankingError::validation(
                "account_number",
                "Account number must not be empty",
            ));
        }
        let len = account_number.len();
        Ok((MIN_ACCOUNT_NUMBER_LEN..=MAX_ACCOUNT_NUMBER_LEN).contains(&len)
            && account_number.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Two upper-case letters followed by 6 to 10 digits, e.g. `CC12345678`
    pub fn is_valid_owner_id(&self, owner_id: &str) -> bool {
        let bytes = owner_id.as_bytes();
        if bytes.len() < 8 || bytes.len() > 12 {
            return false;
        }
        let (prefix, digits) = bytes.split_at(2);
        prefix.iter().all(|b| b.is_ascii_uppercase()) && digits.iter().all(|b| b.is_ascii_digit())
    }

    /// 3 to 100 characters after trimming, with no digits
    pub fn is_valid_owner_name(&self, owner_name: &str) -> bool {
        let trimmed = owner_name.trim();
        let len = trimmed.chars().count();
        (MIN_OWNER_NAME_LEN..=MAX_OWNER_NAME_LEN).contains(&len)
            && !trimmed.chars().any(|c| c.is_ascii_digit())
    }

    pub fn is_valid_opening_balance(&self, balance: Decimal) -> bool {
        balance >= MINIMUM_OPENING_BALANCE && balance <= MAXIMUM_INITIAL_BALANCE
    }

    pub fn minimum_balance_for(&self, account_type: AccountType) -> Decimal {
        match account_type {
            AccountType::Business => dec!(1000000),
            AccountType::Premium => dec!(5000000),
            AccountType::Savings | AccountType::Checking => MINIMUM_OPENING_BALANCE,
        }
    }

    /// Full check of a new account before it is opened
    pub fn validate_for_creation(&self, account: &Account) -> Result<(), BankingError> {
        if !self.is_valid_account_number(&account.account_number)? {
            return Err(BankingError::validation(
                "account_number",
                "Invalid account number format",
            ));
        }
        if !self.is_valid_owner_id(&account.owner_id) {
            return Err(BankingError::validation("owner_id", "Invalid owner id format"));
        }
        if !self.is_valid_owner_name(&account.owner_name) {
            return Err(BankingError::validation("owner_name", "Invalid owner name"));
        }

        let minimum = self.minimum_balance_for(account.account_type);
        if account.balance < minimum {
            return Err(BankingError::validation(
                "balance",
                format!(
                    "Opening balance is below the minimum for this account type: {}",
                    minimum
                ),
            ));
        }
        if !self.is_valid_opening_balance(account.balance) {
            return Err(BankingError::validation(
                "balance",
                "Opening balance exceeds the allowed maximum",
            ));
        }
        Ok(())
    }

    pub fn belong_to_same_owner(&self, first: &Account, second: &Account) -> bool {
        !first.owner_id.is_empty() && first.owner_id == second.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn account(status: AccountStatus) -> Account {
        Account::new("1234567899", "Ander", "CC1234567", dec!(2000), AccountType::Savings)
            .with_status(status)
    }

    #[rstest]
    #[case(AccountStatus::Active, true)]
    #[case(AccountStatus::Inactive, false)]
    #[case(AccountStatus::Blocked, false)]
    #[case(AccountStatus::Closed, false)]
    #[case(AccountStatus::PendingVerification, false)]
    fn test_can_operate(#[case] status: AccountStatus, #[case] expected: bool) {
        let validator = AccountValidator::new();
        assert_eq!(validator.can_operate(Some(&account(status))).unwrap(), expected);
    }

    #[test]
    fn test_can_operate_missing_account() {
        match AccountValidator::new().can_operate(None) {
            Err(BankingError::Validation { field, .. }) => assert_eq!(field, "account"),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[rstest]
    #[case("1234567890", true)]
    #[case("1234567890123456", true)]
    #[case("123456789", false)]
    #[case("12345678901234567", false)]
    #[case("12345abc90", false)]
    fn test_account_number_format(#[case] number: &str, #[case] expected: bool) {
        assert_eq!(AccountValidator::new().is_valid_account_number(number).unwrap(), expected);
    }

    #[test]
    fn test_empty_account_number_is_error() {
        assert!(AccountValidator::new().is_valid_account_number("  ").is_err());
    }

    #[rstest]
    #[case("CC123456", true)]
    #[case("CE1234567890", true)]
    #[case("cc123456", false)]
    #[case("CC12345", false)]
    #[case("C1234567", false)]
    fn test_owner_id_format(#[case] owner_id: &str, #[case] expected: bool) {
        assert_eq!(AccountValidator::new().is_valid_owner_id(owner_id), expected);
    }

    #[test]
    fn test_owner_name_rules() {
        let validator = AccountValidator::new();
        assert!(validator.is_valid_owner_name("Ana"));
        assert!(!validator.is_valid_owner_name("  Al "));
        assert!(!validator.is_valid_owner_name("R2D2"));
        assert!(!validator.is_valid_owner_name(&"x".repeat(101)));
    }

    #[test]
    fn test_validate_for_creation() {
        let validator = AccountValidator::new();
        let mut account = Account::new(
            "1234567890",
            "Maria Lopez",
            "CC12345678",
            dec!(1000000),
            AccountType::Business,
        );
        assert!(validator.validate_for_creation(&account).is_ok());

        account.balance = dec!(999999);
        match validator.validate_for_creation(&account) {
            Err(BankingError::Validation { field, .. }) => assert_eq!(field, "balance"),
            other => panic!("Expected balance validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_same_owner() {
        let validator = AccountValidator::new();
        let first = account(AccountStatus::Active);
        let mut second = account(AccountStatus::Active);
        assert!(validator.belong_to_same_owner(&first, &second));

        second.owner_id = "CC7654321".to_string();
        assert!(!validator.belong_to_same_owner(&first, &second));
    }
}
