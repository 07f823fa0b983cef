//! In-memory stores
//!
//! `DashMap`-backed implementations of the store ports, used by the binary
//! and by tests.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{Account, Transaction, TransactionStatus};

use super::{AccountStore, TransactionStore};

/// Accounts keyed by account number
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<String, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(account);
        }
        store
    }

    pub fn insert(&self, account: Account) {
        self.accounts.insert(account.account_number.clone(), account);
    }

    /// Current snapshot of an account
    pub fn get(&self, account_number: &str) -> Option<Account> {
        self.accounts.get(account_number).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_number(&self, account_number: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.get(account_number))
    }

    async fn save(&self, account: Account) -> anyhow::Result<Account> {
        self.insert(account.clone());
        Ok(account)
    }
}

/// Transactions keyed by id
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: DashMap<Uuid, Transaction>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, transaction_id: Uuid) -> Option<Transaction> {
        self.transactions
            .get(&transaction_id)
            .map(|entry| entry.value().clone())
    }

    /// Snapshot of every stored transaction, oldest first
    pub fn all(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self
            .transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|tx| tx.created_at);
        all
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn find_by_id(&self, transaction_id: Uuid) -> anyhow::Result<Option<Transaction>> {
        Ok(self.get(transaction_id))
    }

    async fn save(&self, transaction: Transaction) -> anyhow::Result<Transaction> {
        self.transactions
            .insert(transaction.transaction_id, transaction.clone());
        Ok(transaction)
    }

    async fn find_by_status(&self, status: TransactionStatus) -> anyhow::Result<Vec<Transaction>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|tx| tx.status == status)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_account_store_roundtrip() {
        let store = InMemoryAccountStore::new();
        assert!(store.find_by_number("1234567899").await.unwrap().is_none());

        let mut account = Account::new("1234567899", "Ander", "CC1234567", dec!(2000), AccountType::Savings);
        store.save(account.clone()).await.unwrap();

        account.debit(dec!(500));
        store.save(account).await.unwrap();

        let stored = store.find_by_number("1234567899").await.unwrap().unwrap();
        assert_eq!(stored.balance, dec!(1500));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_store_find_by_status() {
        let store = InMemoryTransactionStore::new();
        let pending = Transaction::transfer("a", "b", dec!(10), "pending");
        let mut completed = Transaction::transfer("a", "b", dec!(20), "completed");
        completed.transition_to(TransactionStatus::Completed).unwrap();

        store.save(pending.clone()).await.unwrap();
        store.save(completed).await.unwrap();

        let found = store.find_by_status(TransactionStatus::Pending).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].transaction_id, pending.transaction_id);
    }
}
