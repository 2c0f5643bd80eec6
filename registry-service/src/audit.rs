//! Audit trail of registry calls.
//!
//! Every submitted call is recorded with its outcome, including rejected
//! calls that never touched the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use vault_registry::{Address, ApprovalStatus, Receipt};

/// Maximum entries in the audit log before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// What came of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// State changed; event names in order
    Committed { events: Vec<String> },
    /// Accepted without any change
    NoOp,
    /// Recorded as a guild approval
    Pending { approval: ApprovalStatus },
    /// Rejected by the registry
    Rejected { error: String },
}

impl AuditOutcome {
    pub fn from_receipt(receipt: &Receipt) -> Self {
        match receipt.approval {
            Some(approval) => Self::Pending { approval },
            None if !receipt.changes_state() => Self::NoOp,
            None => Self::Committed {
                events: receipt.events.iter().map(|e| e.name().to_string()).collect(),
            },
        }
    }
}

/// An entry in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID
    pub entry_id: String,
    pub network: String,
    pub caller: Address,
    /// Operation name
    pub operation: String,
    pub outcome: AuditOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        network: impl Into<String>,
        caller: Address,
        operation: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            network: network.into(),
            caller,
            operation: operation.into(),
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Bounded audit log, newest entries first.
pub struct AuditLog {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Record an entry, pruning the oldest past the limit. Returns its ID.
    pub async fn record(&self, entry: AuditEntry) -> String {
        let entry_id = entry.entry_id.clone();

        let mut entries = self.entries.write().await;
        entries.push_front(entry);
        while entries.len() > self.max_entries {
            entries.pop_back();
        }

        entry_id
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Get entries submitted by `caller`.
    pub async fn by_caller(&self, caller: &Address, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.caller == *caller)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> AuditStats {
        let entries = self.entries.read().await;

        let mut stats = AuditStats {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries.iter() {
            match entry.outcome {
                AuditOutcome::Committed { .. } => stats.committed += 1,
                AuditOutcome::NoOp => stats.noop += 1,
                AuditOutcome::Pending { .. } => stats.pending += 1,
                AuditOutcome::Rejected { .. } => stats.rejected += 1,
            }
        }
        stats
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub total: usize,
    pub committed: usize,
    pub noop: usize,
    pub pending: usize,
    pub rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_registry::RegistryEvent;

    fn caller(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[tokio::test]
    async fn test_audit_log_prunes_oldest() {
        let log = AuditLog::with_max_entries(2);
        for n in 1..=3 {
            log.record(AuditEntry::new("eth", caller(n), "purge", AuditOutcome::NoOp))
                .await;
        }

        assert_eq!(log.count().await, 2);
        let recent = log.recent(10).await;
        assert_eq!(recent[0].caller, caller(3));
        assert_eq!(recent[1].caller, caller(2));
    }

    #[tokio::test]
    async fn test_audit_stats() {
        let log = AuditLog::new();
        let receipt = Receipt::with_event(RegistryEvent::AddVersion {
            version: "v3".to_string(),
        });

        log.record(AuditEntry::new(
            "eth",
            caller(1),
            "add_version",
            AuditOutcome::from_receipt(&receipt),
        ))
        .await;
        log.record(AuditEntry::new(
            "eth",
            caller(9),
            "add_version",
            AuditOutcome::Rejected {
                error: "!auth".to_string(),
            },
        ))
        .await;
        log.record(AuditEntry::new(
            "eth",
            caller(1),
            "add_version",
            AuditOutcome::from_receipt(&Receipt::noop()),
        ))
        .await;

        let stats = log.stats().await;
        assert_eq!(
            stats,
            AuditStats {
                total: 3,
                committed: 1,
                noop: 1,
                pending: 0,
                rejected: 1,
            }
        );
        assert_eq!(log.by_caller(&caller(1), 10).await.len(), 2);

        log.clear().await;
        assert_eq!(log.count().await, 0);
    }
}
