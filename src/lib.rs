//! transfer_saga Library
//!
//! Money-transfer orchestration with saga-style compensation.
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod audit;
pub mod config;
pub mod domain;
mod error;
pub mod fraud;
pub mod jobs;
pub mod notification;
pub mod orchestrator;
pub mod store;

pub use config::Config;
pub use domain::{
    Account, AccountStatus, AccountType, Amount, AmountError, BankingError, OperationContext,
    Transaction, TransactionStatus, TransferCategory, TransferReceipt, TransferRequest,
    TransferResult,
};
pub use error::{AppError, AppResult};
pub use orchestrator::{OrchestratorSettings, TransferOrchestrator};
