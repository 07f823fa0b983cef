//! Store module
//!
//! Persistence ports consumed by the orchestrator. Records are keyed by
//! account number and transaction id; the deploying system supplies the
//! backing implementation.

mod memory;

pub use memory::{InMemoryAccountStore, InMemoryTransactionStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Transaction, TransactionStatus};

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by its number
    async fn find_by_number(&self, account_number: &str) -> anyhow::Result<Option<Account>>;

    /// Insert or replace an account, returning the stored record
    async fn save(&self, account: Account) -> anyhow::Result<Account>;
}

/// Transaction persistence
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find_by_id(&self, transaction_id: Uuid) -> anyhow::Result<Option<Transaction>>;

    /// Insert or replace a transaction, returning the stored record
    async fn save(&self, transaction: Transaction) -> anyhow::Result<Transaction>;

    async fn find_by_status(&self, status: TransactionStatus) -> anyhow::Result<Vec<Transaction>>;
}
