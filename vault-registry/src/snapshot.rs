//! Persisted form of the registry and its state digest.
//!
//! The reverse key index is stored as per-address key lists so its order
//! survives a restore. Pending guild approvals are not persisted.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::directory::{CandidateLists, Catalogue, ProductionDirectory};
use crate::error::{RegistryError, Result};
use crate::keys::KeyDirectory;
use crate::quorum::GuildApprovals;
use crate::registry::Registry;
use crate::roles::{RoleSet, StrategistGuild};
use crate::types::{Address, CandidateEntry, VaultEntry};

/// A candidate entry together with the author that listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub author: Address,
    #[serde(flatten)]
    pub entry: CandidateEntry,
}

/// A key directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    pub address: Address,
}

/// Keys naming one address, in reverse-index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseKeyRecord {
    pub address: Address,
    pub keys: Vec<String>,
}

/// Full registry state in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub roles: RoleSet,
    pub versions: Vec<String>,
    pub metadatas: Vec<String>,
    pub candidates: Vec<CandidateRecord>,
    /// Production entries, bucket by bucket in bucket order
    pub production: Vec<VaultEntry>,
    pub keys: Vec<KeyRecord>,
    /// Sorted by address; empty in snapshots that predate it
    #[serde(default)]
    pub reverse_keys: Vec<ReverseKeyRecord>,
    #[serde(default)]
    pub guild_quorum: bool,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RegistryError::InvalidInput(format!("snapshot encode: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RegistryError::InvalidInput(format!("snapshot decode: {e}")))
    }
}

impl Registry {
    /// Capture the full state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            roles: self.roles.clone(),
            versions: self.versions.entries().to_vec(),
            metadatas: self.metadatas.entries().to_vec(),
            candidates: self
                .candidates
                .all()
                .into_iter()
                .map(|(author, entry)| CandidateRecord { author, entry })
                .collect(),
            production: self.production.all().into_iter().cloned().collect(),
            keys: self
                .keys
                .entries()
                .into_iter()
                .map(|(key, address)| KeyRecord { key, address })
                .collect(),
            reverse_keys: self
                .keys
                .reverse_entries()
                .into_iter()
                .map(|(address, keys)| ReverseKeyRecord { address, keys })
                .collect(),
            guild_quorum: self.guild_quorum,
        }
    }

    /// Rebuild a registry from a snapshot, including the reverse key index.
    pub fn restore(snapshot: RegistrySnapshot) -> Result<Self> {
        let roles = snapshot.roles;
        if roles.governance.is_zero() {
            return Err(RegistryError::InvalidInput(
                "snapshot governance is the zero address".to_string(),
            ));
        }
        let guild = roles.strategist_guild();
        if !guild.is_empty() {
            StrategistGuild::new(guild.members().to_vec(), guild.threshold())?;
        }

        let mut candidates = CandidateLists::default();
        for record in snapshot.candidates {
            candidates.insert(
                &record.entry.version,
                record.author,
                record.entry.address,
                &record.entry.metadata,
            );
        }

        let mut production = ProductionDirectory::default();
        for entry in snapshot.production {
            if production.place(entry.clone()).is_some() {
                return Err(RegistryError::InvalidInput(format!(
                    "vault {} appears twice in snapshot",
                    entry.address
                )));
            }
        }

        let keys = KeyDirectory::from_parts(
            snapshot.keys.into_iter().map(|r| (r.key, r.address)),
            snapshot
                .reverse_keys
                .into_iter()
                .map(|r| (r.address, r.keys))
                .collect(),
        )?;

        tracing::info!(
            vaults = production.len(),
            keys = keys.count(),
            "Registry restored from snapshot"
        );

        Ok(Self {
            roles,
            versions: Catalogue::from_entries(snapshot.versions),
            metadatas: Catalogue::from_entries(snapshot.metadatas),
            candidates,
            production,
            keys,
            approvals: GuildApprovals::default(),
            guild_quorum: snapshot.guild_quorum,
        })
    }

    /// SHA-256 over the canonical snapshot encoding, hex encoded.
    pub fn state_hash(&self) -> Result<String> {
        // Struct fields serialize in declaration order and every list is
        // already in deterministic order.
        let bytes = serde_json::to_vec(&self.snapshot())
            .map_err(|e| RegistryError::InvalidInput(format!("snapshot encode: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InitParams;
    use crate::types::VaultStatus;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn populated() -> Registry {
        let gov = addr(1);
        let mut registry =
            Registry::initialize(InitParams::new(gov, vec![addr(3), addr(4)], 1)).unwrap();
        registry.add("v1", addr(10), "name=a", addr(9)).unwrap();
        registry.add("v1", addr(11), "name=b", addr(9)).unwrap();
        registry
            .promote(addr(10), "v1", "name=a", VaultStatus::Open, gov)
            .unwrap();
        registry
            .promote(addr(12), "v2", "name=c", VaultStatus::Guarded, gov)
            .unwrap();
        registry.set_key("controller", addr(20), gov).unwrap();
        registry.set_key("vault", addr(20), gov).unwrap();
        registry.add_metadata("name=a", gov).unwrap();
        registry
    }

    #[test]
    fn test_restore_reproduces_queries() {
        let registry = populated();
        let json = registry.snapshot().to_json().unwrap();
        let restored = Registry::restore(RegistrySnapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.state_hash().unwrap(), registry.state_hash().unwrap());
        assert_eq!(restored.vaults("v1", addr(9)), registry.vaults("v1", addr(9)));
        assert_eq!(restored.production_vaults(), registry.production_vaults());
        assert_eq!(restored.keys_of_address(&addr(20)), vec!["controller", "vault"]);
        assert_eq!(restored.key_of_address(&addr(20)), Some("controller"));
        assert_eq!(restored.production_metadata(0).unwrap(), "name=a");
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut registry = populated();
        let before = registry.state_hash().unwrap();
        registry.purge(addr(10), addr(1)).unwrap();
        assert_ne!(registry.state_hash().unwrap(), before);
    }

    #[test]
    fn test_restore_keeps_reverse_key_order() {
        let gov = addr(1);
        let mut registry = Registry::initialize(InitParams::new(gov, vec![], 1)).unwrap();
        for (key, target) in [("k1", 20), ("k2", 20), ("k3", 21), ("k4", 20), ("k1", 22)] {
            registry.set_key(key, addr(target), gov).unwrap();
        }
        assert_eq!(registry.key_of_address(&addr(20)), Some("k4"));

        let json = registry.snapshot().to_json().unwrap();
        let restored = Registry::restore(RegistrySnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored.key_of_address(&addr(20)), Some("k4"));
        assert_eq!(restored.keys_of_address(&addr(20)), registry.keys_of_address(&addr(20)));
        assert_eq!(restored.state_hash().unwrap(), registry.state_hash().unwrap());

        // Same forward map, different reverse order: the hash tells them apart
        let mut fresh = Registry::initialize(InitParams::new(gov, vec![], 1)).unwrap();
        for (key, target) in [("k1", 22), ("k2", 20), ("k3", 21), ("k4", 20)] {
            fresh.set_key(key, addr(target), gov).unwrap();
        }
        assert_eq!(fresh.keys(), registry.keys());
        assert_ne!(fresh.state_hash().unwrap(), registry.state_hash().unwrap());
    }

    #[test]
    fn test_restore_without_reverse_lists() {
        let mut snapshot = populated().snapshot();
        snapshot.reverse_keys.clear();
        let restored = Registry::restore(snapshot).unwrap();
        assert_eq!(restored.keys_of_address(&addr(20)), vec!["controller", "vault"]);
    }

    #[test]
    fn test_duplicate_vault_rejected() {
        let mut snapshot = populated().snapshot();
        let dup = snapshot.production[0].clone();
        snapshot.production.push(dup);
        assert!(Registry::restore(snapshot).is_err());
    }
}
