//! Strategist guild approvals.
//!
//! With quorum enabled, a guild member's production call is an approval
//! for that exact action. The action runs once `threshold` distinct members
//! have submitted it.

use std::collections::{BTreeMap, BTreeSet};

use crate::events::ApprovalStatus;
use crate::types::{Address, VaultStatus};

/// A production change proposed by the strategist guild.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GuildAction {
    Promote {
        vault: Address,
        version: String,
        metadata: String,
        status: VaultStatus,
    },
    Demote {
        vault: Address,
        status: VaultStatus,
    },
    Purge {
        vault: Address,
    },
    UpdateMetadata {
        vault: Address,
        metadata: String,
    },
}

impl GuildAction {
    pub fn vault(&self) -> Address {
        match self {
            Self::Promote { vault, .. }
            | Self::Demote { vault, .. }
            | Self::Purge { vault }
            | Self::UpdateMetadata { vault, .. } => *vault,
        }
    }
}

/// Outcome of recording an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Quorum reached; the action should run now
    Ready,
    /// More approvals needed
    Pending(ApprovalStatus),
}

#[derive(Debug, Clone, Default)]
pub struct GuildApprovals {
    pending: BTreeMap<GuildAction, BTreeSet<Address>>,
}

impl GuildApprovals {
    /// Record `member`'s approval. Clears the action once quorum is reached.
    pub fn approve(&mut self, action: GuildAction, member: Address, threshold: usize) -> Approval {
        let approvers = self.pending.entry(action.clone()).or_default();
        approvers.insert(member);

        if approvers.len() >= threshold {
            self.pending.remove(&action);
            Approval::Ready
        } else {
            Approval::Pending(ApprovalStatus {
                approvals: approvers.len(),
                threshold,
            })
        }
    }

    /// Drop every pending approval.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drop pending approvals for actions on `vault`. Returns how many
    /// actions were dropped.
    pub fn clear_vault(&mut self, vault: &Address) -> usize {
        let before = self.pending.len();
        self.pending.retain(|action, _| action.vault() != *vault);
        before - self.pending.len()
    }

    /// Approvals collected so far for `action`.
    pub fn approvals(&self, action: &GuildAction) -> usize {
        self.pending.get(action).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_quorum_needs_distinct_members() {
        let mut approvals = GuildApprovals::default();
        let action = GuildAction::Purge { vault: addr(1) };

        assert!(matches!(
            approvals.approve(action.clone(), addr(3), 2),
            Approval::Pending(ApprovalStatus { approvals: 1, threshold: 2 })
        ));
        // Same member again does not count twice
        assert!(matches!(
            approvals.approve(action.clone(), addr(3), 2),
            Approval::Pending(_)
        ));
        assert_eq!(approvals.approve(action.clone(), addr(4), 2), Approval::Ready);
        assert_eq!(approvals.approvals(&action), 0);
    }

    #[test]
    fn test_different_actions_tracked_separately() {
        let mut approvals = GuildApprovals::default();
        approvals.approve(
            GuildAction::Demote { vault: addr(1), status: VaultStatus::Experimental },
            addr(3),
            2,
        );
        approvals.approve(
            GuildAction::Demote { vault: addr(1), status: VaultStatus::Guarded },
            addr(4),
            2,
        );
        assert_eq!(approvals.pending_count(), 2);
        approvals.clear();
        assert_eq!(approvals.pending_count(), 0);
    }

    #[test]
    fn test_clear_vault_keeps_other_vaults() {
        let mut approvals = GuildApprovals::default();
        approvals.approve(GuildAction::Purge { vault: addr(1) }, addr(3), 2);
        approvals.approve(
            GuildAction::UpdateMetadata { vault: addr(1), metadata: "name=a".to_string() },
            addr(3),
            2,
        );
        approvals.approve(GuildAction::Purge { vault: addr(2) }, addr(3), 2);

        assert_eq!(approvals.clear_vault(&addr(1)), 2);
        assert_eq!(approvals.pending_count(), 1);
        assert_eq!(approvals.approvals(&GuildAction::Purge { vault: addr(2) }), 1);
    }
}
