//! Domain module
//!
//! Core domain types and business rules.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod transaction;
pub mod transfer;
pub mod validator;

pub use account::{Account, AccountSide, AccountStatus, AccountType};
pub use amount::{Amount, AmountError};
pub use context::OperationContext;
pub use error::BankingError;
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use transfer::{TransferCategory, TransferReceipt, TransferRequest, TransferResult};
pub use validator::AccountValidator;
