//! Strategist guild quorum mode

use vault_registry::{
    Address, ApprovalStatus, InitParams, Registry, RegistrySnapshot, VaultStatus,
};

const META: &str = "name=BTC-CVX,protocol=Badger,behavior=DCA";

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn quorum_registry() -> Registry {
    Registry::initialize(
        InitParams::new(addr(1), vec![addr(3), addr(4), addr(5)], 2).with_guild_quorum(true),
    )
    .unwrap()
}

#[test]
fn test_promotion_waits_for_threshold() {
    let mut registry = quorum_registry();
    assert!(registry.guild_quorum());

    let receipt = registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(3))
        .unwrap();
    assert!(receipt.is_noop());
    assert_eq!(
        receipt.approval,
        Some(ApprovalStatus { approvals: 1, threshold: 2 })
    );
    assert!(registry.production_entry(&addr(10)).is_none());

    // Repeating an approval does not advance it
    let receipt = registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(3))
        .unwrap();
    assert_eq!(receipt.approval.map(|a| a.approvals), Some(1));

    let receipt = registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(5))
        .unwrap();
    assert!(receipt.event("PromoteVault").is_some());
    assert!(receipt.approval.is_none());
    assert_eq!(
        registry.production_entry(&addr(10)).unwrap().status,
        VaultStatus::Open
    );
}

#[test]
fn test_differing_actions_do_not_combine() {
    let mut registry = quorum_registry();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(3))
        .unwrap();
    let receipt = registry
        .promote(addr(10), "v1", META, VaultStatus::Guarded, addr(4))
        .unwrap();
    assert!(receipt.approval.is_some());
    assert!(registry.production_entry(&addr(10)).is_none());
}

#[test]
fn test_governance_bypasses_quorum() {
    let mut registry = quorum_registry();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(1))
        .unwrap();

    let receipt = registry.purge(addr(10), addr(4)).unwrap();
    assert!(receipt.approval.is_some());
    assert!(registry.production_entry(&addr(10)).is_some());

    let receipt = registry.purge(addr(10), addr(5)).unwrap();
    assert!(receipt.event("PurgeVault").is_some());
    assert!(registry.production_entry(&addr(10)).is_none());
}

#[test]
fn test_guild_replacement_drops_approvals() {
    let mut registry = quorum_registry();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(1))
        .unwrap();
    registry.demote(addr(10), VaultStatus::Guarded, addr(3)).unwrap();

    registry
        .set_strategist_guild(vec![addr(3), addr(4)], 2, addr(1))
        .unwrap();

    let receipt = registry.demote(addr(10), VaultStatus::Guarded, addr(4)).unwrap();
    assert_eq!(receipt.approval.map(|a| a.approvals), Some(1));
    assert_eq!(
        registry.production_entry(&addr(10)).unwrap().status,
        VaultStatus::Open
    );
}

#[test]
fn test_quorum_flag_survives_snapshot() {
    let registry = quorum_registry();
    let json = registry.snapshot().to_json().unwrap();
    let restored = Registry::restore(RegistrySnapshot::from_json(&json).unwrap()).unwrap();
    assert!(restored.guild_quorum());
    assert_eq!(restored.multisig_threshold(), 2);
}

#[test]
fn test_production_change_drops_stale_approvals() {
    let mut registry = quorum_registry();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(1))
        .unwrap();

    // Guild opens a purge and a re-promotion, then governance purges
    registry.purge(addr(10), addr(3)).unwrap();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Guarded, addr(3))
        .unwrap();
    registry.purge(addr(10), addr(1)).unwrap();
    assert!(registry.production_entry(&addr(10)).is_none());

    // A fresh approval starts over instead of completing the old one
    let receipt = registry
        .promote(addr(10), "v1", META, VaultStatus::Guarded, addr(4))
        .unwrap();
    assert_eq!(receipt.approval.map(|a| a.approvals), Some(1));
    assert!(registry.production_entry(&addr(10)).is_none());

    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(1))
        .unwrap();
    let receipt = registry.purge(addr(10), addr(5)).unwrap();
    assert_eq!(receipt.approval.map(|a| a.approvals), Some(1));
    assert!(registry.production_entry(&addr(10)).is_some());
}
