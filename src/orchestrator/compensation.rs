//! Compensation log
//!
//! Every mutating saga step pushes the action that undoes it once the step
//! has been persisted. On failure the log is unwound newest first.

use std::fmt;

use crate::domain::{Account, AccountSide};
use crate::store::AccountStore;

/// Action that semantically reverses one committed step
#[derive(Debug, Clone)]
pub enum CompensatingAction {
    /// Write back the account as it was before the step touched it
    RestoreAccount { side: AccountSide, snapshot: Account },
}

impl CompensatingAction {
    async fn execute(&self, accounts: &dyn AccountStore) -> anyhow::Result<()> {
        match self {
            CompensatingAction::RestoreAccount { snapshot, .. } => {
                accounts.save(snapshot.clone()).await?;
                Ok(())
            }
        }
    }
}

impl fmt::Display for CompensatingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensatingAction::RestoreAccount { side, snapshot } => write!(
                f,
                "restore {} account {} to balance {}",
                side, snapshot.account_number, snapshot.balance
            ),
        }
    }
}

/// A compensating action that could not be applied
#[derive(Debug)]
pub struct CompensationFailure {
    pub action: CompensatingAction,
    pub error: anyhow::Error,
}

impl fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.error)
    }
}

/// Ordered undo log for one transfer attempt
#[derive(Debug, Default)]
pub struct CompensationLog {
    actions: Vec<CompensatingAction>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: CompensatingAction) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Apply every action newest first. A failing action does not stop the
    /// ones before it from being attempted.
    pub async fn unwind(self, accounts: &dyn AccountStore) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();
        for action in self.actions.into_iter().rev() {
            if let Err(error) = action.execute(accounts).await {
                failures.push(CompensationFailure { action, error });
            }
        }
        failures
    }
}
