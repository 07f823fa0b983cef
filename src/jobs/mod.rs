//! Scheduled Jobs
//!
//! Background execution of scheduled transfers once they become due.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::orchestrator::{ScheduledRunReport, TransferOrchestrator};

/// Configuration for the scheduled transfer runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How often due transfers are looked for (default: 30 seconds)
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Runs due scheduled transfers on a fixed interval
pub struct ScheduledTransferRunner {
    orchestrator: TransferOrchestrator,
    config: RunnerConfig,
    shutdown: watch::Receiver<bool>,
}

impl ScheduledTransferRunner {
    pub fn new(
        orchestrator: TransferOrchestrator,
        config: RunnerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            orchestrator,
            config,
            shutdown,
        }
    }

    /// Start the runner in the background
    /// Returns a handle that completes once shutdown is signalled
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let mut shutdown = self.shutdown.clone();
        tracing::info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "Scheduled transfer runner started"
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduled transfer runner stopped");
    }

    /// Execute everything due now (for manual trigger or testing)
    pub async fn run_once(&self) -> ScheduledRunReport {
        match self.orchestrator.execute_due_scheduled(Utc::now()).await {
            Ok(report) => {
                if report.due > 0 {
                    tracing::info!(
                        due = report.due,
                        completed = report.completed.len(),
                        failed = report.failed.len(),
                        skipped = report.skipped.len(),
                        "Processed due scheduled transfers"
                    );
                }
                report
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled transfer run failed");
                ScheduledRunReport {
                    errors: vec![e.to_string()],
                    ..Default::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditLog;
    use crate::domain::{Account, AccountType, Transaction, TransactionStatus, TransferCategory};
    use crate::fraud::RuleBasedFraudService;
    use crate::notification::LogNotifier;
    use crate::orchestrator::OrchestratorSettings;
    use crate::store::{InMemoryAccountStore, InMemoryTransactionStore, TransactionStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_runner_config_default() {
        assert_eq!(RunnerConfig::default().poll_interval, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_run_once_executes_due_placeholder() {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts([
            Account::new("1234567899", "Ander", "CC1234567", dec!(2000), AccountType::Savings),
            Account::new("1234567897", "Maria", "CC7654321", dec!(2000), AccountType::Savings),
        ]));
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let orchestrator = TransferOrchestrator::new(
            accounts.clone(),
            transactions.clone(),
            Arc::new(RuleBasedFraudService::new()),
            Arc::new(LogNotifier::new()),
            Arc::new(InMemoryAuditLog::new()),
            OrchestratorSettings::default(),
        );

        let mut placeholder =
            Transaction::transfer("1234567899", "1234567897", dec!(500), "Rent");
        placeholder.category = Some(TransferCategory::SameBank);
        placeholder.scheduled_for = Some(Utc::now() - chrono::Duration::seconds(1));
        let placeholder_id = placeholder.transaction_id;
        transactions.save(placeholder).await.unwrap();

        let (_tx, rx) = watch::channel(false);
        let runner = ScheduledTransferRunner::new(orchestrator, RunnerConfig::default(), rx);
        let report = runner.run_once().await;

        assert_eq!(report.due, 1);
        assert_eq!(report.completed, vec![placeholder_id]);
        assert_eq!(accounts.get("1234567899").unwrap().balance, dec!(1500));
        assert_eq!(transactions.len(), 1);
        assert_eq!(
            transactions.get(placeholder_id).unwrap().status,
            TransactionStatus::Completed
        );

        // Nothing left to run
        let again = runner.run_once().await;
        assert_eq!(again.due, 0);
    }
}
