//! Audit Log Service
//!
//! `AuditService` is the audit trail the orchestrator writes to. The
//! in-memory adapter keeps a tamper-evident log: every entry carries the
//! SHA-256 of its content chained to the previous entry's hash.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Operation kinds opened with `start_operation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    Transfer,
    Rollback,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Transfer => "TRANSFER",
            AuditOperation::Rollback => "ROLLBACK",
        }
    }
}

impl std::fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit trail capability
#[async_trait]
pub trait AuditService: Send + Sync {
    /// Open an operation and return the audit correlation id
    async fn start_operation(
        &self,
        operation: AuditOperation,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> anyhow::Result<Uuid>;

    async fn log_success(&self, audit_id: Uuid, result: &str) -> anyhow::Result<()>;

    async fn log_failure(&self, audit_id: Uuid, error_code: &str, message: &str) -> anyhow::Result<()>;

    async fn log_balance_change(
        &self,
        account_id: &str,
        before: Decimal,
        after: Decimal,
        transaction_id: Uuid,
    ) -> anyhow::Result<()>;
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub sequence_number: u64,
    /// Correlation id of the operation this entry belongs to
    pub audit_id: Option<Uuid>,
    /// `TRANSFER.started`, `ROLLBACK.failure`, `balance.changed`, ...
    pub action: String,
    pub account_id: Option<String>,
    pub details: serde_json::Value,
    pub previous_hash: String,
    pub current_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    fn hash_input(&self) -> String {
        format!(
            "{}{}{}{}{}{}{}",
            self.id,
            self.sequence_number,
            self.audit_id.map(|u| u.to_string()).unwrap_or_default(),
            self.action,
            self.account_id.as_deref().unwrap_or_default(),
            self.details,
            self.previous_hash
        )
    }
}

/// Result of hash chain verification
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

impl ChainVerificationResult {
    fn valid(entries_checked: u64) -> Self {
        Self {
            is_valid: true,
            entries_checked,
            first_invalid_entry: None,
            expected_hash: None,
            actual_hash: None,
        }
    }

    fn broken(entry: &AuditLogEntry, expected: String, actual: String) -> Self {
        Self {
            is_valid: false,
            entries_checked: entry.sequence_number,
            first_invalid_entry: Some(entry.id),
            expected_hash: Some(expected),
            actual_hash: Some(actual),
        }
    }
}

/// Hash-chained in-memory audit log
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<AuditLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(
        &self,
        audit_id: Option<Uuid>,
        action: String,
        account_id: Option<&str>,
        details: serde_json::Value,
    ) -> Uuid {
        let mut entries = self.guard();
        let previous_hash = entries
            .last()
            .map(|e| e.current_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut entry = AuditLogEntry {
            id: Uuid::new_v4(),
            sequence_number: entries.len() as u64 + 1,
            audit_id,
            action,
            account_id: account_id.map(str::to_string),
            details,
            previous_hash,
            current_hash: String::new(),
            created_at: Utc::now(),
        };
        entry.current_hash = sha256_hex(&entry.hash_input());

        tracing::debug!(
            entry_id = %entry.id,
            action = %entry.action,
            "Audit log entry created"
        );

        let id = entry.id;
        entries.push(entry);
        id
    }

    /// All entries in sequence order
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.guard().clone()
    }

    /// Entries recorded under one audit correlation id
    pub fn entries_for(&self, audit_id: Uuid) -> Vec<AuditLogEntry> {
        self.guard()
            .iter()
            .filter(|e| e.audit_id == Some(audit_id))
            .cloned()
            .collect()
    }

    /// Entries whose action matches exactly
    pub fn entries_with_action(&self, action: &str) -> Vec<AuditLogEntry> {
        self.guard()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    /// Verify the integrity of the hash chain
    pub fn verify_hash_chain(&self) -> ChainVerificationResult {
        let entries = self.guard();
        let mut previous_hash = GENESIS_HASH.to_string();

        for entry in entries.iter() {
            if entry.previous_hash != previous_hash {
                return ChainVerificationResult::broken(
                    entry,
                    previous_hash,
                    entry.previous_hash.clone(),
                );
            }

            let calculated_hash = sha256_hex(&entry.hash_input());
            if calculated_hash != entry.current_hash {
                return ChainVerificationResult::broken(
                    entry,
                    calculated_hash,
                    entry.current_hash.clone(),
                );
            }

            previous_hash = entry.current_hash.clone();
        }

        ChainVerificationResult::valid(entries.len() as u64)
    }
}

#[async_trait]
impl AuditService for InMemoryAuditLog {
    async fn start_operation(
        &self,
        operation: AuditOperation,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> anyhow::Result<Uuid> {
        let audit_id = Uuid::new_v4();
        self.append(
            Some(audit_id),
            format!("{}.started", operation),
            Some(account_id),
            metadata,
        );
        Ok(audit_id)
    }

    async fn log_success(&self, audit_id: Uuid, result: &str) -> anyhow::Result<()> {
        self.append(
            Some(audit_id),
            "operation.success".to_string(),
            None,
            serde_json::json!({ "result": result }),
        );
        Ok(())
    }

    async fn log_failure(&self, audit_id: Uuid, error_code: &str, message: &str) -> anyhow::Result<()> {
        self.append(
            Some(audit_id),
            "operation.failure".to_string(),
            None,
            serde_json::json!({ "error_code": error_code, "message": message }),
        );
        Ok(())
    }

    async fn log_balance_change(
        &self,
        account_id: &str,
        before: Decimal,
        after: Decimal,
        transaction_id: Uuid,
    ) -> anyhow::Result<()> {
        self.append(
            None,
            "balance.changed".to_string(),
            Some(account_id),
            serde_json::json!({
                "before": before.to_string(),
                "after": after.to_string(),
                "transaction_id": transaction_id,
            }),
        );
        Ok(())
    }
}

/// Calculate SHA-256 hash and return as hex string
fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
