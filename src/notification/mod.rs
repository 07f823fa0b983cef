//! Notification module
//!
//! Customer push notices and the operational e-mail channel. Delivery is
//! best-effort from the orchestrator's point of view.

use async_trait::async_trait;

use crate::domain::Transaction;

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Push a notice to the owner of `account_id`; `false` when not delivered
    async fn push_notify(&self, account_id: &str, title: &str, body: &str) -> anyhow::Result<bool>;

    async fn send_email(&self, address: &str, subject: &str, body: &str) -> anyhow::Result<bool>;

    async fn notify_completed(&self, transaction: &Transaction) -> anyhow::Result<()>;
}

/// Notifier that only writes to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationService for LogNotifier {
    async fn push_notify(&self, account_id: &str, title: &str, body: &str) -> anyhow::Result<bool> {
        tracing::info!(account_id, title, body, "Push notification");
        Ok(true)
    }

    async fn send_email(&self, address: &str, subject: &str, body: &str) -> anyhow::Result<bool> {
        tracing::info!(address, subject, body, "E-mail notification");
        Ok(true)
    }

    async fn notify_completed(&self, transaction: &Transaction) -> anyhow::Result<()> {
        tracing::info!(
            transaction_id = %transaction.transaction_id,
            status = %transaction.status,
            "Transaction completed notification"
        );
        Ok(())
    }
}
