//! The registry state machine.
//!
//! Every mutating call names its caller explicitly, runs its role check and
//! input validation first, then commits in one step. Failed calls leave the
//! registry unchanged; no-op calls succeed with an empty [`Receipt`].

use tracing::{debug, info, warn};

use crate::directory::{CandidateLists, Catalogue, ProductionDirectory};
use crate::error::{RegistryError, Result};
use crate::events::{Receipt, RegistryEvent};
use crate::keys::{KeyChange, KeyDirectory};
use crate::metadata;
use crate::quorum::{Approval, GuildAction, GuildApprovals};
use crate::roles::{Operation, Role, RoleSet, StrategistGuild};
use crate::types::{
    Address, CandidateEntry, MetadataBucket, ProductionBucket, VaultEntry, VaultStatus,
};

/// Versions registered at initialization unless overridden.
pub const DEFAULT_VERSIONS: [&str; 2] = ["v1", "v2"];

/// Parameters for the one-time initialization of a registry.
#[derive(Debug, Clone)]
pub struct InitParams {
    /// Initial governance address
    pub governance: Address,
    /// Initial strategist guild members
    pub strategist_guild: Vec<Address>,
    /// Guild approval threshold
    pub threshold: usize,
    /// Initial version catalogue
    pub versions: Vec<String>,
    /// Require guild quorum for strategist production calls
    pub guild_quorum: bool,
}

impl InitParams {
    pub fn new(governance: Address, strategist_guild: Vec<Address>, threshold: usize) -> Self {
        Self {
            governance,
            strategist_guild,
            threshold,
            versions: DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect(),
            guild_quorum: false,
        }
    }

    /// Builder: replace the initial version catalogue.
    pub fn with_versions(mut self, versions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: toggle guild quorum.
    pub fn with_guild_quorum(mut self, enabled: bool) -> Self {
        self.guild_quorum = enabled;
        self
    }
}

/// Vault registry: candidate lists, production directory, key directory,
/// role table and catalogues.
#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) roles: RoleSet,
    pub(crate) versions: Catalogue,
    pub(crate) metadatas: Catalogue,
    pub(crate) candidates: CandidateLists,
    pub(crate) production: ProductionDirectory,
    pub(crate) keys: KeyDirectory,
    pub(crate) approvals: GuildApprovals,
    pub(crate) guild_quorum: bool,
}

impl Registry {
    /// Create a registry with its initial roles and versions.
    pub fn initialize(params: InitParams) -> Result<Self> {
        let guild = if params.strategist_guild.is_empty() {
            StrategistGuild::default()
        } else {
            StrategistGuild::new(params.strategist_guild, params.threshold)?
        };
        let roles = RoleSet::new(params.governance, guild)?;

        if params.versions.iter().any(String::is_empty) {
            return Err(RegistryError::InvalidInput("empty version".to_string()));
        }

        info!(
            governance = %roles.governance(),
            guild_size = roles.strategist_guild().members().len(),
            threshold = roles.strategist_guild().threshold(),
            guild_quorum = params.guild_quorum,
            "Registry initialized"
        );

        Ok(Self {
            roles,
            versions: Catalogue::from_entries(params.versions),
            metadatas: Catalogue::default(),
            candidates: CandidateLists::default(),
            production: ProductionDirectory::default(),
            keys: KeyDirectory::new(),
            approvals: GuildApprovals::default(),
            guild_quorum: params.guild_quorum,
        })
    }

    fn authorize(&self, caller: &Address, operation: Operation) -> Result<Role> {
        self.roles.authorize(caller, operation).inspect_err(|_| {
            warn!(caller = %caller, operation = operation.as_str(), "Unauthorized call rejected");
        })
    }

    /// Gate a strategist call behind guild quorum. Returns a pending receipt
    /// while approvals are outstanding.
    fn gate(&mut self, role: Role, caller: Address, action: GuildAction) -> Option<Receipt> {
        if role != Role::StrategistGuild || !self.guild_quorum {
            return None;
        }
        let threshold = self.roles.strategist_guild().threshold();
        match self.approvals.approve(action, caller, threshold) {
            Approval::Ready => None,
            Approval::Pending(status) => {
                debug!(
                    caller = %caller,
                    approvals = status.approvals,
                    threshold = status.threshold,
                    "Guild approval recorded"
                );
                Some(Receipt::pending(status))
            }
        }
    }

    /// Pending guild approvals for `vault` no longer describe its entry
    /// once the entry changes.
    fn drop_stale_approvals(&mut self, vault: &Address) {
        let dropped = self.approvals.clear_vault(vault);
        if dropped > 0 {
            debug!(vault = %vault, dropped, "Stale guild approvals dropped");
        }
    }

    // ------------------------------------------------------------------
    // Candidate lists
    // ------------------------------------------------------------------

    /// Add `vault` to the caller's candidate list for `version`.
    pub fn add(
        &mut self,
        version: &str,
        vault: Address,
        metadata: &str,
        caller: Address,
    ) -> Result<Receipt> {
        require_version(version)?;
        require_nonzero(&vault, "vault")?;
        metadata::validate(metadata)?;

        if !self.candidates.insert(version, caller, vault, metadata) {
            debug!(vault = %vault, author = %caller, "Candidate already listed");
            return Ok(Receipt::noop());
        }

        info!(vault = %vault, author = %caller, version, "Candidate vault added");
        Ok(Receipt::with_event(RegistryEvent::NewVault {
            author: caller,
            version: version.to_string(),
            metadata: metadata.to_string(),
            vault,
        }))
    }

    /// Remove `vault` from the caller's own candidate list.
    pub fn remove(&mut self, version: &str, vault: Address, caller: Address) -> Result<Receipt> {
        if !self.candidates.remove(version, caller, &vault) {
            debug!(vault = %vault, author = %caller, "No candidate to remove");
            return Ok(Receipt::noop());
        }

        info!(vault = %vault, author = %caller, version, "Candidate vault removed");
        Ok(Receipt::with_event(RegistryEvent::RemoveVault {
            author: caller,
            version: version.to_string(),
            vault,
        }))
    }

    // ------------------------------------------------------------------
    // Production lifecycle
    // ------------------------------------------------------------------

    /// Move `vault` into the (version, status) production bucket.
    ///
    /// Dev-governance promotions always land in `Experimental`.
    pub fn promote(
        &mut self,
        vault: Address,
        version: &str,
        metadata: &str,
        status: VaultStatus,
        caller: Address,
    ) -> Result<Receipt> {
        let role = self.authorize(&caller, Operation::Promote)?;
        require_nonzero(&vault, "vault")?;
        require_version(version)?;
        metadata::validate(metadata)?;

        let status = match role {
            Role::DevGovernance => VaultStatus::Experimental,
            _ => status,
        };

        let entry = VaultEntry {
            address: vault,
            version: version.to_string(),
            metadata: metadata.to_string(),
            status,
        };
        if self.production.entry(&vault) == Some(&entry) {
            debug!(vault = %vault, status = %status, "Vault already in bucket");
            return Ok(Receipt::noop());
        }

        let action = GuildAction::Promote {
            vault,
            version: entry.version.clone(),
            metadata: entry.metadata.clone(),
            status,
        };
        if let Some(pending) = self.gate(role, caller, action) {
            return Ok(pending);
        }

        let previous = self.production.place(entry);
        self.drop_stale_approvals(&vault);
        info!(
            vault = %vault,
            version,
            status = %status,
            from = ?previous.map(|p| p.status),
            author = %caller,
            "Vault promoted"
        );
        Ok(Receipt::with_event(RegistryEvent::PromoteVault {
            author: caller,
            version: version.to_string(),
            metadata: metadata.to_string(),
            vault,
            status,
        }))
    }

    /// Lower the status of a production vault.
    pub fn demote(&mut self, vault: Address, status: VaultStatus, caller: Address) -> Result<Receipt> {
        let role = self.authorize(&caller, Operation::Demote)?;
        let current = self
            .production
            .entry(&vault)
            .cloned()
            .ok_or(RegistryError::VaultNotFound(vault))?;

        if status >= current.status {
            warn!(vault = %vault, from = %current.status, to = %status, "Demotion must lower status");
            return Err(RegistryError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        if let Some(pending) = self.gate(role, caller, GuildAction::Demote { vault, status }) {
            return Ok(pending);
        }

        let demoted = VaultEntry { status, ..current };
        let event = RegistryEvent::DemoteVault {
            author: caller,
            version: demoted.version.clone(),
            metadata: demoted.metadata.clone(),
            vault,
            status,
        };
        self.production.place(demoted);
        self.drop_stale_approvals(&vault);

        info!(vault = %vault, status = %status, author = %caller, "Vault demoted");
        Ok(Receipt::with_event(event))
    }

    /// Remove a vault from production entirely.
    pub fn purge(&mut self, vault: Address, caller: Address) -> Result<Receipt> {
        let role = self.authorize(&caller, Operation::Purge)?;
        if self.production.entry(&vault).is_none() {
            return Err(RegistryError::VaultNotFound(vault));
        }

        if let Some(pending) = self.gate(role, caller, GuildAction::Purge { vault }) {
            return Ok(pending);
        }

        let entry = self
            .production
            .remove(&vault)
            .ok_or(RegistryError::VaultNotFound(vault))?;
        self.drop_stale_approvals(&vault);

        info!(vault = %vault, status = %entry.status, author = %caller, "Vault purged");
        Ok(Receipt::with_event(RegistryEvent::PurgeVault {
            author: caller,
            version: entry.version,
            metadata: entry.metadata,
            vault,
            status: entry.status,
        }))
    }

    /// Overwrite the metadata of a production vault.
    pub fn update_metadata(
        &mut self,
        vault: Address,
        metadata: &str,
        caller: Address,
    ) -> Result<Receipt> {
        let role = self.authorize(&caller, Operation::UpdateMetadata)?;
        metadata::validate(metadata)?;

        let current = self
            .production
            .entry(&vault)
            .ok_or(RegistryError::VaultNotFound(vault))?;
        if current.metadata == metadata {
            return Ok(Receipt::noop());
        }

        let action = GuildAction::UpdateMetadata {
            vault,
            metadata: metadata.to_string(),
        };
        if let Some(pending) = self.gate(role, caller, action) {
            return Ok(pending);
        }

        self.production.set_metadata(&vault, metadata);
        self.drop_stale_approvals(&vault);
        info!(vault = %vault, metadata, author = %caller, "Vault metadata updated");
        Ok(Receipt::with_event(RegistryEvent::UpdateMetadata {
            author: caller,
            vault,
            metadata: metadata.to_string(),
        }))
    }

    // ------------------------------------------------------------------
    // Key directory
    // ------------------------------------------------------------------

    /// Point `key` at `address`.
    pub fn set_key(&mut self, key: &str, address: Address, caller: Address) -> Result<Receipt> {
        self.authorize(&caller, Operation::ManageKeys)?;
        if key.is_empty() {
            return Err(RegistryError::InvalidInput("empty key".to_string()));
        }
        require_nonzero(&address, "key target")?;

        let event = match self.keys.set(key, address) {
            KeyChange::Unchanged => return Ok(Receipt::noop()),
            KeyChange::Added => RegistryEvent::AddKey {
                key: key.to_string(),
                at: address,
            },
            KeyChange::Replaced(previous) => {
                debug!(key, previous = %previous, "Key re-pointed");
                RegistryEvent::SetKey {
                    key: key.to_string(),
                    at: address,
                }
            }
        };

        info!(key, at = %address, "Key set");
        Ok(Receipt::with_event(event))
    }

    /// Alias of [`Registry::set_key`].
    pub fn add_key(&mut self, key: &str, address: Address, caller: Address) -> Result<Receipt> {
        self.set_key(key, address, caller)
    }

    /// Remove `key` from the directory.
    pub fn delete_key(&mut self, key: &str, caller: Address) -> Result<Receipt> {
        self.authorize(&caller, Operation::ManageKeys)?;
        let at = self
            .keys
            .delete(key)
            .ok_or_else(|| RegistryError::KeyNotFound(key.to_string()))?;

        info!(key, at = %at, "Key deleted");
        Ok(Receipt::with_event(RegistryEvent::DeleteKey {
            key: key.to_string(),
            at,
        }))
    }

    /// Remove several keys. Authorization is checked once for the batch;
    /// keys not in the directory are skipped.
    pub fn delete_keys<I, S>(&mut self, keys: I, caller: Address) -> Result<Receipt>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.authorize(&caller, Operation::ManageKeys)?;

        let mut receipt = Receipt::noop();
        for key in keys {
            let key = key.as_ref();
            if let Some(at) = self.keys.delete(key) {
                info!(key, at = %at, "Key deleted");
                receipt.events.push(RegistryEvent::DeleteKey {
                    key: key.to_string(),
                    at,
                });
            }
        }
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Catalogues
    // ------------------------------------------------------------------

    /// Append a version to the catalogue.
    pub fn add_version(&mut self, version: &str, caller: Address) -> Result<Receipt> {
        self.authorize(&caller, Operation::AddVersion)?;
        require_version(version)?;

        if !self.versions.push(version) {
            return Ok(Receipt::noop());
        }
        info!(version, "Version added");
        Ok(Receipt::with_event(RegistryEvent::AddVersion {
            version: version.to_string(),
        }))
    }

    /// Append a metadata string to the production metadata catalogue.
    pub fn add_metadata(&mut self, metadata: &str, caller: Address) -> Result<Receipt> {
        self.authorize(&caller, Operation::AddMetadata)?;
        metadata::validate(metadata)?;

        if !self.metadatas.push(metadata) {
            return Ok(Receipt::noop());
        }
        info!(metadata, "Metadata added");
        Ok(Receipt::with_event(RegistryEvent::AddMetadata {
            metadata: metadata.to_string(),
        }))
    }

    // ------------------------------------------------------------------
    // Role management
    // ------------------------------------------------------------------

    /// Hand governance to a different address.
    pub fn set_governance(&mut self, governance: Address, caller: Address) -> Result<()> {
        self.authorize(&caller, Operation::SetGovernance)?;
        require_nonzero(&governance, "governance")?;
        if governance == self.roles.governance {
            return Err(RegistryError::InvalidInput(
                "governance is already held by this address".to_string(),
            ));
        }

        info!(from = %self.roles.governance, to = %governance, "Governance transferred");
        self.roles.governance = governance;
        Ok(())
    }

    /// Set dev-governance. Callable by governance or the current dev.
    pub fn set_dev(&mut self, dev: Address, caller: Address) -> Result<()> {
        self.authorize(&caller, Operation::SetDev)?;
        require_nonzero(&dev, "dev governance")?;

        info!(dev = %dev, "Dev governance set");
        self.roles.dev_governance = Some(dev);
        Ok(())
    }

    /// Set the developer address.
    pub fn set_developer(&mut self, developer: Address, caller: Address) -> Result<()> {
        self.authorize(&caller, Operation::SetDeveloper)?;
        require_nonzero(&developer, "developer")?;

        info!(developer = %developer, "Developer set");
        self.roles.developer = Some(developer);
        Ok(())
    }

    /// Replace the strategist guild. An empty list clears it.
    pub fn set_strategist_guild(
        &mut self,
        members: Vec<Address>,
        threshold: usize,
        caller: Address,
    ) -> Result<()> {
        self.authorize(&caller, Operation::SetStrategistGuild)?;
        let guild = StrategistGuild::new(members, threshold)?;

        info!(
            members = guild.members().len(),
            threshold = guild.threshold(),
            "Strategist guild replaced"
        );
        self.roles.strategist_guild = guild;
        self.approvals.clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn governance(&self) -> Address {
        self.roles.governance()
    }

    pub fn dev_governance(&self) -> Option<Address> {
        self.roles.dev_governance()
    }

    pub fn developer(&self) -> Option<Address> {
        self.roles.developer()
    }

    /// Guild member at `index`.
    pub fn strategist_guild(&self, index: usize) -> Result<Address> {
        self.roles.strategist_guild().member(index)
    }

    pub fn strategist_guild_members(&self) -> &[Address] {
        self.roles.strategist_guild().members()
    }

    pub fn is_strategist(&self, address: &Address) -> bool {
        self.roles.strategist_guild().contains(address)
    }

    pub fn multisig_threshold(&self) -> usize {
        self.roles.strategist_guild().threshold()
    }

    pub fn guild_quorum(&self) -> bool {
        self.guild_quorum
    }

    /// Role `caller` holds, highest precedence first.
    pub fn role_of(&self, caller: &Address) -> Role {
        self.roles.classify(caller)
    }

    /// Candidates listed by `author` for `version`.
    pub fn vaults(&self, version: &str, author: Address) -> Vec<CandidateEntry> {
        self.candidates.list(version, author)
    }

    /// Candidates listed by `author` for `version` with exactly `metadata`.
    pub fn vaults_with_metadata(
        &self,
        version: &str,
        author: Address,
        metadata: &str,
    ) -> Vec<CandidateEntry> {
        self.candidates
            .list(version, author)
            .into_iter()
            .filter(|c| c.metadata == metadata)
            .collect()
    }

    /// Production entries of one bucket, optionally narrowed to `metadata`.
    pub fn filtered_production_vaults(
        &self,
        version: &str,
        status: VaultStatus,
        metadata: Option<&str>,
    ) -> Vec<VaultEntry> {
        self.production
            .bucket(version, status)
            .into_iter()
            .filter(|e| metadata.map_or(true, |m| e.metadata == m))
            .cloned()
            .collect()
    }

    /// Production entries with `metadata` and `status` across all versions.
    pub fn production_vaults_by_metadata_and_status(
        &self,
        metadata: &str,
        status: VaultStatus,
    ) -> Vec<VaultEntry> {
        self.known_versions()
            .iter()
            .flat_map(|v| self.filtered_production_vaults(v, status, Some(metadata)))
            .collect()
    }

    /// Every (version, status) cell over the version catalogue,
    /// status-major.
    pub fn production_vaults(&self) -> Vec<ProductionBucket> {
        VaultStatus::ALL
            .iter()
            .flat_map(|status| {
                self.versions.entries().iter().map(move |version| ProductionBucket {
                    version: version.clone(),
                    status: *status,
                    vaults: self.filtered_production_vaults(version, *status, None),
                })
            })
            .collect()
    }

    /// Every (version, status, metadata) cell over both catalogues,
    /// ordered by status, then metadata, then version.
    pub fn production_vaults_by_metadata(&self) -> Vec<MetadataBucket> {
        let mut cells = Vec::new();
        for status in VaultStatus::ALL {
            for metadata in self.metadatas.entries() {
                for version in self.versions.entries() {
                    cells.push(MetadataBucket {
                        version: version.clone(),
                        status,
                        metadata: metadata.clone(),
                        vaults: self
                            .filtered_production_vaults(version, status, Some(metadata))
                            .into_iter()
                            .map(|e| e.address)
                            .collect(),
                    });
                }
            }
        }
        cells
    }

    /// Production entry for `vault`.
    pub fn production_entry(&self, vault: &Address) -> Option<&VaultEntry> {
        self.production.entry(vault)
    }

    /// Catalogued versions followed by any other version in production.
    fn known_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.versions.entries().to_vec();
        let mut extra: Vec<String> = self
            .production
            .all()
            .into_iter()
            .map(|e| e.version.clone())
            .filter(|v| !self.versions.contains(v))
            .collect();
        extra.dedup();
        versions.extend(extra);
        versions
    }

    pub fn version(&self, index: usize) -> Result<&str> {
        self.versions.get(index)
    }

    pub fn versions(&self) -> &[String] {
        self.versions.entries()
    }

    pub fn production_metadata(&self, index: usize) -> Result<&str> {
        self.metadatas.get(index)
    }

    pub fn production_metadatas(&self) -> &[String] {
        self.metadatas.entries()
    }

    pub fn address_of_key(&self, key: &str) -> Option<Address> {
        self.keys.address_of(key)
    }

    pub fn key_of_address(&self, address: &Address) -> Option<&str> {
        self.keys.key_of(address)
    }

    pub fn keys_of_address(&self, address: &Address) -> Vec<String> {
        self.keys.keys_of(address)
    }

    pub fn keys_count(&self) -> usize {
        self.keys.count()
    }

    /// Every (key, address) pair in directory order.
    pub fn keys(&self) -> Vec<(String, Address)> {
        self.keys.entries()
    }
}

fn require_nonzero(address: &Address, what: &str) -> Result<()> {
    if address.is_zero() {
        return Err(RegistryError::InvalidInput(format!(
            "{what} cannot be the zero address"
        )));
    }
    Ok(())
}

fn require_version(version: &str) -> Result<()> {
    if version.is_empty() {
        return Err(RegistryError::InvalidInput("empty version".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    const GOV: u8 = 1;
    const DEV: u8 = 2;
    const RANDO: u8 = 9;
    const META: &str = "name=BTC-CVX,protocol=Badger,behavior=DCA";

    fn registry() -> Registry {
        let mut registry =
            Registry::initialize(InitParams::new(addr(GOV), vec![addr(3), addr(4), addr(5)], 2))
                .unwrap();
        registry.set_dev(addr(DEV), addr(GOV)).unwrap();
        registry
    }

    #[test]
    fn test_initialize_defaults() {
        let registry = registry();
        assert_eq!(registry.governance(), addr(GOV));
        assert_eq!(registry.version(0).unwrap(), "v1");
        assert_eq!(registry.version(1).unwrap(), "v2");
        assert_eq!(registry.multisig_threshold(), 2);
        assert!(registry.production_metadatas().is_empty());
    }

    #[test]
    fn test_promote_noop_on_same_bucket() {
        let mut registry = registry();
        let vault = addr(20);
        let receipt = registry
            .promote(vault, "v1", META, VaultStatus::Experimental, addr(GOV))
            .unwrap();
        assert!(receipt.event("PromoteVault").is_some());

        let receipt = registry
            .promote(vault, "v1", META, VaultStatus::Experimental, addr(GOV))
            .unwrap();
        assert!(receipt.is_noop());
    }

    #[test]
    fn test_failed_demote_leaves_state() {
        let mut registry = registry();
        let vault = addr(20);
        registry
            .promote(vault, "v1", META, VaultStatus::Guarded, addr(GOV))
            .unwrap();

        let err = registry.demote(vault, VaultStatus::Open, addr(GOV)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidTransition {
                from: VaultStatus::Guarded,
                to: VaultStatus::Open
            }
        );
        assert_eq!(
            registry.production_entry(&vault).unwrap().status,
            VaultStatus::Guarded
        );
    }

    #[test]
    fn test_unauthorized_is_reported() {
        let mut registry = registry();
        let err = registry
            .promote(addr(20), "v1", META, VaultStatus::Open, addr(RANDO))
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().starts_with("!auth"));
    }

    #[test]
    fn test_known_versions_include_uncatalogued() {
        let mut registry = registry();
        registry
            .promote(addr(20), "v9", META, VaultStatus::Open, addr(GOV))
            .unwrap();
        let found = registry.production_vaults_by_metadata_and_status(META, VaultStatus::Open);
        assert_eq!(found.len(), 1);
        // Not part of the catalogue cross-product
        assert!(registry
            .production_vaults()
            .iter()
            .all(|b| b.vaults.is_empty()));
    }
}
