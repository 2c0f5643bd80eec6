//! Configuration for registry deployments.
//!
//! One YAML document describes every network the service can deploy to:
//!
//! ```yaml
//! networks:
//!   eth:
//!     governance: "0xb65cef03b9b89f99517643226d76e286ee999e77"
//!     strategist_guild:
//!       - "0x86cbd0ce0c087b482782c181da8d191de18c8275"
//!     threshold: 1
//! audit:
//!   enabled: true
//!   max_entries: 10000
//! state_dir: ./state
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use vault_registry::{Address, InitParams, DEFAULT_VERSIONS};

use crate::error::Result;

/// Configuration for the registry service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Deployable networks by name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,
    /// Directory holding `<network>.json` snapshots
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl ServiceConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read and parse a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Builder: add or replace a network.
    pub fn with_network(mut self, name: impl Into<String>, network: NetworkConfig) -> Self {
        self.networks.insert(name.into(), network);
        self
    }

    /// Builder: set the snapshot directory.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    /// Snapshot path for `network`, when persistence is configured.
    pub fn state_path(&self, network: &str) -> Option<PathBuf> {
        self.state_dir
            .as_ref()
            .map(|dir| dir.join(format!("{network}.json")))
    }
}

/// Initial roles and catalogues of one network's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Governance address
    pub governance: Address,
    /// Strategist guild members
    #[serde(default)]
    pub strategist_guild: Vec<Address>,
    /// Guild approval threshold
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// Initial version catalogue
    #[serde(default = "default_versions")]
    pub versions: Vec<String>,
    /// Require guild quorum for strategist production calls
    #[serde(default)]
    pub guild_quorum: bool,
}

impl NetworkConfig {
    pub fn new(governance: Address) -> Self {
        Self {
            governance,
            strategist_guild: Vec::new(),
            threshold: default_threshold(),
            versions: default_versions(),
            guild_quorum: false,
        }
    }

    /// Builder: set the strategist guild.
    pub fn with_guild(mut self, members: Vec<Address>, threshold: usize) -> Self {
        self.strategist_guild = members;
        self.threshold = threshold;
        self
    }

    /// Builder: toggle guild quorum.
    pub fn with_guild_quorum(mut self, enabled: bool) -> Self {
        self.guild_quorum = enabled;
        self
    }

    pub fn init_params(&self) -> InitParams {
        InitParams::new(self.governance, self.strategist_guild.clone(), self.threshold)
            .with_versions(self.versions.clone())
            .with_guild_quorum(self.guild_quorum)
    }
}

fn default_threshold() -> usize {
    1
}

fn default_versions() -> Vec<String> {
    DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect()
}

/// Audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record every call in the audit log
    pub enabled: bool,
    /// Maximum entries retained
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
        }
    }
}
