//! JSON output for the CLI.

use serde::Serialize;

use registry_service::ServiceError;
use vault_registry::{Address, ApprovalStatus, ProductionBucket, Receipt, Registry, RegistryEvent};

#[derive(Serialize)]
struct CallLine<'a> {
    index: usize,
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [RegistryEvent]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    approval: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn receipt_line(index: usize, op: &str, receipt: &Receipt) -> serde_json::Result<String> {
    serde_json::to_string(&CallLine {
        index,
        op,
        events: Some(receipt.events.as_slice()),
        approval: receipt.approval,
        error: None,
    })
}

pub fn rejection_line(index: usize, op: &str, error: &ServiceError) -> serde_json::Result<String> {
    serde_json::to_string(&CallLine {
        index,
        op,
        events: None,
        approval: None,
        error: Some(error.to_string()),
    })
}

/// Registry state as printed by `show`.
#[derive(Serialize)]
pub struct Summary {
    network: String,
    state_hash: String,
    governance: Address,
    dev_governance: Option<Address>,
    developer: Option<Address>,
    strategist_guild: Vec<Address>,
    threshold: usize,
    guild_quorum: bool,
    versions: Vec<String>,
    metadatas: Vec<String>,
    /// Non-empty production buckets only
    production: Vec<ProductionBucket>,
    keys: Vec<KeyLine>,
}

#[derive(Serialize)]
struct KeyLine {
    key: String,
    address: Address,
}

pub fn summary(network: &str, registry: &Registry, state_hash: &str) -> Summary {
    Summary {
        network: network.to_string(),
        state_hash: state_hash.to_string(),
        governance: registry.governance(),
        dev_governance: registry.dev_governance(),
        developer: registry.developer(),
        strategist_guild: registry.strategist_guild_members().to_vec(),
        threshold: registry.multisig_threshold(),
        guild_quorum: registry.guild_quorum(),
        versions: registry.versions().to_vec(),
        metadatas: registry.production_metadatas().to_vec(),
        production: registry
            .production_vaults()
            .into_iter()
            .filter(|bucket| !bucket.vaults.is_empty())
            .collect(),
        keys: registry
            .keys()
            .into_iter()
            .map(|(key, address)| KeyLine { key, address })
            .collect(),
    }
}
