//! Notifications emitted by committed registry calls.

use serde::{Deserialize, Serialize};

use crate::types::{Address, VaultStatus};

/// An event produced by a state-changing call.
///
/// No-op calls emit nothing, so the presence of an event is how callers
/// tell "succeeded with effect" from "succeeded without effect".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    NewVault {
        author: Address,
        version: String,
        metadata: String,
        vault: Address,
    },
    RemoveVault {
        author: Address,
        version: String,
        vault: Address,
    },
    PromoteVault {
        author: Address,
        version: String,
        metadata: String,
        vault: Address,
        status: VaultStatus,
    },
    DemoteVault {
        author: Address,
        version: String,
        metadata: String,
        vault: Address,
        status: VaultStatus,
    },
    PurgeVault {
        author: Address,
        version: String,
        metadata: String,
        vault: Address,
        status: VaultStatus,
    },
    UpdateMetadata {
        author: Address,
        vault: Address,
        metadata: String,
    },
    AddKey {
        key: String,
        at: Address,
    },
    SetKey {
        key: String,
        at: Address,
    },
    DeleteKey {
        key: String,
        at: Address,
    },
    AddVersion {
        version: String,
    },
    AddMetadata {
        metadata: String,
    },
}

impl RegistryEvent {
    /// Event name as observers see it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewVault { .. } => "NewVault",
            Self::RemoveVault { .. } => "RemoveVault",
            Self::PromoteVault { .. } => "PromoteVault",
            Self::DemoteVault { .. } => "DemoteVault",
            Self::PurgeVault { .. } => "PurgeVault",
            Self::UpdateMetadata { .. } => "UpdateMetadata",
            Self::AddKey { .. } => "AddKey",
            Self::SetKey { .. } => "SetKey",
            Self::DeleteKey { .. } => "DeleteKey",
            Self::AddVersion { .. } => "AddVersion",
            Self::AddMetadata { .. } => "AddMetadata",
        }
    }

    /// Vault the event concerns, if any.
    pub fn vault(&self) -> Option<Address> {
        match self {
            Self::NewVault { vault, .. }
            | Self::RemoveVault { vault, .. }
            | Self::PromoteVault { vault, .. }
            | Self::DemoteVault { vault, .. }
            | Self::PurgeVault { vault, .. }
            | Self::UpdateMetadata { vault, .. } => Some(*vault),
            _ => None,
        }
    }
}

/// Progress of a strategist guild action awaiting quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    /// Distinct members that have submitted the action
    pub approvals: usize,
    /// Approvals needed to execute
    pub threshold: usize,
}

/// Outcome of a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Events emitted, in order
    pub events: Vec<RegistryEvent>,
    /// Set when the call was recorded as a guild approval instead of executing
    pub approval: Option<ApprovalStatus>,
    /// Set by role changes, which commit without emitting an event
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub roles_changed: bool,
}

impl Receipt {
    /// Receipt for a call that changed nothing.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn with_event(event: RegistryEvent) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }

    /// Receipt for a committed role change.
    pub fn role_change() -> Self {
        Self {
            roles_changed: true,
            ..Self::default()
        }
    }

    pub(crate) fn pending(approval: ApprovalStatus) -> Self {
        Self {
            approval: Some(approval),
            ..Self::default()
        }
    }

    /// True when no event was emitted.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    /// True when the call changed persisted state, with or without events.
    pub fn changes_state(&self) -> bool {
        !self.events.is_empty() || self.roles_changed
    }

    /// First event with the given name.
    pub fn event(&self, name: &str) -> Option<&RegistryEvent> {
        self.events.iter().find(|e| e.name() == name)
    }
}
