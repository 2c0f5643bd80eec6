//! Serializable registry calls.
//!
//! A [`CallRequest`] names its caller and one [`Call`]; batches of them are
//! what `registry-node apply` reads from disk.

use serde::{Deserialize, Serialize};

use vault_registry::{Address, Receipt, Registry, VaultStatus};

/// A caller-attributed registry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub caller: Address,
    #[serde(flatten)]
    pub call: Call,
}

impl CallRequest {
    pub fn new(caller: Address, call: Call) -> Self {
        Self { caller, call }
    }
}

/// One mutating registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    Add {
        version: String,
        vault: Address,
        metadata: String,
    },
    Remove {
        version: String,
        vault: Address,
    },
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
    SetKey {
        key: String,
        address: Address,
    },
    DeleteKey {
        key: String,
    },
    DeleteKeys {
        keys: Vec<String>,
    },
    AddVersion {
        version: String,
    },
    AddMetadata {
        metadata: String,
    },
    SetGovernance {
        governance: Address,
    },
    SetDev {
        dev: Address,
    },
    SetDeveloper {
        developer: Address,
    },
    SetStrategistGuild {
        members: Vec<Address>,
        threshold: usize,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Promote { .. } => "promote",
            Self::Demote { .. } => "demote",
            Self::Purge { .. } => "purge",
            Self::UpdateMetadata { .. } => "update_metadata",
            Self::SetKey { .. } => "set_key",
            Self::DeleteKey { .. } => "delete_key",
            Self::DeleteKeys { .. } => "delete_keys",
            Self::AddVersion { .. } => "add_version",
            Self::AddMetadata { .. } => "add_metadata",
            Self::SetGovernance { .. } => "set_governance",
            Self::SetDev { .. } => "set_dev",
            Self::SetDeveloper { .. } => "set_developer",
            Self::SetStrategistGuild { .. } => "set_strategist_guild",
        }
    }

    /// Run the call against `registry` as `caller`.
    ///
    /// Role setters emit no events; their receipt is marked as a role change.
    pub fn apply(&self, registry: &mut Registry, caller: Address) -> vault_registry::Result<Receipt> {
        match self {
            Self::Add {
                version,
                vault,
                metadata,
            } => registry.add(version, *vault, metadata, caller),
            Self::Remove { version, vault } => registry.remove(version, *vault, caller),
            Self::Promote {
                vault,
                version,
                metadata,
                status,
            } => registry.promote(*vault, version, metadata, *status, caller),
            Self::Demote { vault, status } => registry.demote(*vault, *status, caller),
            Self::Purge { vault } => registry.purge(*vault, caller),
            Self::UpdateMetadata { vault, metadata } => {
                registry.update_metadata(*vault, metadata, caller)
            }
            Self::SetKey { key, address } => registry.set_key(key, *address, caller),
            Self::DeleteKey { key } => registry.delete_key(key, caller),
            Self::DeleteKeys { keys } => registry.delete_keys(keys, caller),
            Self::AddVersion { version } => registry.add_version(version, caller),
            Self::AddMetadata { metadata } => registry.add_metadata(metadata, caller),
            Self::SetGovernance { governance } => registry
                .set_governance(*governance, caller)
                .map(|()| Receipt::role_change()),
            Self::SetDev { dev } => registry.set_dev(*dev, caller).map(|()| Receipt::role_change()),
            Self::SetDeveloper { developer } => registry
                .set_developer(*developer, caller)
                .map(|()| Receipt::role_change()),
            Self::SetStrategistGuild { members, threshold } => registry
                .set_strategist_guild(members.clone(), *threshold, caller)
                .map(|()| Receipt::role_change()),
        }
    }
}

/// Parse a JSON array of call requests.
pub fn parse_batch(json: &str) -> serde_json::Result<Vec<CallRequest>> {
    serde_json::from_str(json)
}
