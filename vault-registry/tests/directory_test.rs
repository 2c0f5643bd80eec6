//! Candidate lists, key directory, roles and catalogues

use vault_registry::{
    Address, InitParams, Registry, RegistryError, RegistryEvent, Role, VaultStatus,
};

const META: &str = "name=BTC-CVX,protocol=Badger,behavior=DCA";

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

const GOV: u8 = 1;
const DEV: u8 = 2;
const USER: u8 = 7;
const RANDO: u8 = 9;

fn registry() -> Registry {
    let mut registry =
        Registry::initialize(InitParams::new(addr(GOV), vec![addr(3), addr(4), addr(5)], 2))
            .unwrap();
    registry.set_dev(addr(DEV), addr(GOV)).unwrap();
    registry
}

fn listed(registry: &Registry, version: &str, author: u8) -> Vec<Address> {
    registry
        .vaults(version, addr(author))
        .into_iter()
        .map(|c| c.address)
        .collect()
}

// =============================================================================
// Candidate lists
// =============================================================================

#[test]
fn test_add_and_duplicate_add() {
    let mut registry = registry();

    let receipt = registry.add("v1", addr(10), META, addr(USER)).unwrap();
    assert_eq!(
        receipt.events,
        vec![RegistryEvent::NewVault {
            author: addr(USER),
            version: "v1".to_string(),
            metadata: META.to_string(),
            vault: addr(10),
        }]
    );
    assert!(registry.add("v1", addr(10), META, addr(USER)).unwrap().is_noop());
    assert_eq!(listed(&registry, "v1", USER), vec![addr(10)]);

    // Lists are per author and per version
    assert!(listed(&registry, "v1", RANDO).is_empty());
    assert!(listed(&registry, "v2", USER).is_empty());
}

#[test]
fn test_add_rejects_free_form_metadata() {
    let mut registry = registry();
    assert!(matches!(
        registry.add("v1", addr(10), "BTC CVX", addr(USER)),
        Err(RegistryError::InvalidMetadata(_))
    ));
    assert!(listed(&registry, "v1", USER).is_empty());
}

#[test]
fn test_remove_uses_swap_order() {
    let mut registry = registry();
    for vault in [10, 11, 12] {
        registry.add("v1", addr(vault), META, addr(USER)).unwrap();
    }

    let receipt = registry.remove("v1", addr(10), addr(USER)).unwrap();
    assert_eq!(
        receipt.events,
        vec![RegistryEvent::RemoveVault {
            author: addr(USER),
            version: "v1".to_string(),
            vault: addr(10),
        }]
    );
    assert_eq!(listed(&registry, "v1", USER), vec![addr(12), addr(11)]);
}

#[test]
fn test_remove_only_touches_own_list() {
    let mut registry = registry();
    registry.add("v1", addr(10), META, addr(USER)).unwrap();

    assert!(registry.remove("v1", addr(10), addr(RANDO)).unwrap().is_noop());
    assert!(registry.remove("v1", addr(10), addr(GOV)).unwrap().is_noop());
    assert_eq!(listed(&registry, "v1", USER), vec![addr(10)]);
}

#[test]
fn test_vaults_with_metadata() {
    let mut registry = registry();
    registry.add("v1", addr(10), META, addr(USER)).unwrap();
    registry.add("v1", addr(11), "name=ETH-CVX", addr(USER)).unwrap();

    let found = registry.vaults_with_metadata("v1", addr(USER), "name=ETH-CVX");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, addr(11));
}

#[test]
fn test_candidate_and_production_are_independent() {
    let mut registry = registry();
    registry.add("v1", addr(10), META, addr(USER)).unwrap();
    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(GOV))
        .unwrap();
    registry.purge(addr(10), addr(GOV)).unwrap();

    assert_eq!(listed(&registry, "v1", USER), vec![addr(10)]);
}

// =============================================================================
// Key directory
// =============================================================================

#[test]
fn test_keys_add_repoint_delete() {
    let mut registry = registry();

    let receipt = registry.set_key("controller", addr(20), addr(GOV)).unwrap();
    assert_eq!(
        receipt.events,
        vec![RegistryEvent::AddKey {
            key: "controller".to_string(),
            at: addr(20),
        }]
    );
    assert!(registry
        .set_key("controller", addr(20), addr(GOV))
        .unwrap()
        .is_noop());

    let receipt = registry.add_key("controller", addr(21), addr(GOV)).unwrap();
    assert!(matches!(
        receipt.event("SetKey"),
        Some(RegistryEvent::SetKey { at, .. }) if *at == addr(21)
    ));
    assert_eq!(registry.address_of_key("controller"), Some(addr(21)));
    assert_eq!(registry.key_of_address(&addr(20)), None);
    assert_eq!(registry.keys_count(), 1);

    registry.delete_key("controller", addr(GOV)).unwrap();
    assert_eq!(registry.address_of_key("controller"), None);
    assert_eq!(registry.key_of_address(&addr(21)), None);
    assert_eq!(registry.keys_count(), 0);

    assert_eq!(
        registry.delete_key("controller", addr(GOV)),
        Err(RegistryError::KeyNotFound("controller".to_string()))
    );
}

#[test]
fn test_keys_governance_only() {
    let mut registry = registry();
    for caller in [DEV, 3, RANDO] {
        assert!(registry
            .set_key("controller", addr(20), addr(caller))
            .unwrap_err()
            .is_unauthorized());
    }
    registry.set_key("controller", addr(20), addr(GOV)).unwrap();
    assert!(registry
        .delete_key("controller", addr(DEV))
        .unwrap_err()
        .is_unauthorized());
    assert!(registry
        .set_key("controller", Address::ZERO, addr(GOV))
        .is_err());
}

#[test]
fn test_one_address_many_keys() {
    let mut registry = registry();
    registry.set_key("badgerTree", addr(20), addr(GOV)).unwrap();
    registry.set_key("rewardsLogger", addr(20), addr(GOV)).unwrap();
    registry.set_key("keeper", addr(21), addr(GOV)).unwrap();

    assert_eq!(
        registry.keys_of_address(&addr(20)),
        vec!["badgerTree".to_string(), "rewardsLogger".to_string()]
    );
    assert_eq!(registry.key_of_address(&addr(20)), Some("badgerTree"));

    let receipt = registry
        .delete_keys(["badgerTree", "missing", "keeper"], addr(GOV))
        .unwrap();
    assert_eq!(receipt.events.len(), 2);
    assert_eq!(registry.keys_of_address(&addr(20)), vec!["rewardsLogger".to_string()]);
    assert_eq!(
        registry.keys(),
        vec![("rewardsLogger".to_string(), addr(20))]
    );
}

// =============================================================================
// Roles
// =============================================================================

#[test]
fn test_role_setters() {
    let mut registry = registry();

    assert!(registry.set_governance(addr(30), addr(RANDO)).unwrap_err().is_unauthorized());
    assert!(registry.set_governance(addr(GOV), addr(GOV)).is_err());
    assert!(registry.set_governance(Address::ZERO, addr(GOV)).is_err());

    // Dev governance may hand itself over
    registry.set_dev(addr(31), addr(DEV)).unwrap();
    assert_eq!(registry.dev_governance(), Some(addr(31)));
    assert!(registry.set_dev(addr(32), addr(DEV)).unwrap_err().is_unauthorized());

    assert!(registry.set_developer(addr(33), addr(31)).is_err());
    registry.set_developer(addr(33), addr(GOV)).unwrap();
    assert_eq!(registry.developer(), Some(addr(33)));
    assert_eq!(registry.role_of(&addr(33)), Role::Developer);

    registry.set_governance(addr(30), addr(GOV)).unwrap();
    assert_eq!(registry.governance(), addr(30));
    assert!(registry.add_version("v3", addr(GOV)).unwrap_err().is_unauthorized());
}

#[test]
fn test_strategist_guild_replacement() {
    let mut registry = registry();
    assert_eq!(registry.strategist_guild(1).unwrap(), addr(4));
    assert!(registry.is_strategist(&addr(5)));

    assert!(registry
        .set_strategist_guild(vec![addr(40), addr(41)], 3, addr(GOV))
        .is_err());
    assert!(registry
        .set_strategist_guild(vec![addr(40), addr(40)], 1, addr(GOV))
        .is_err());
    assert!(registry
        .set_strategist_guild(vec![addr(40)], 0, addr(GOV))
        .is_err());
    assert!(registry
        .set_strategist_guild(vec![addr(40)], 1, addr(3))
        .unwrap_err()
        .is_unauthorized());

    registry
        .set_strategist_guild(vec![addr(40), addr(41)], 2, addr(GOV))
        .unwrap();
    assert_eq!(registry.strategist_guild_members(), &[addr(40), addr(41)]);
    assert_eq!(registry.multisig_threshold(), 2);
    assert!(!registry.is_strategist(&addr(3)));
    assert!(registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(3))
        .is_err());

    registry.set_strategist_guild(vec![], 1, addr(GOV)).unwrap();
    assert!(matches!(
        registry.strategist_guild(0),
        Err(RegistryError::IndexOutOfBounds { index: 0, len: 0 })
    ));
}

#[test]
fn test_role_precedence() {
    let mut registry = registry();
    // Dev governance who also sits in the guild acts as a strategist
    registry
        .set_strategist_guild(vec![addr(DEV), addr(4)], 1, addr(GOV))
        .unwrap();
    assert_eq!(registry.role_of(&addr(DEV)), Role::StrategistGuild);

    registry
        .promote(addr(10), "v1", META, VaultStatus::Open, addr(DEV))
        .unwrap();
    assert_eq!(
        registry.production_entry(&addr(10)).unwrap().status,
        VaultStatus::Open
    );
    assert_eq!(registry.role_of(&addr(GOV)), Role::Governance);
    assert_eq!(registry.role_of(&addr(RANDO)), Role::Other);
}

#[test]
fn test_initialize_validation() {
    assert!(Registry::initialize(InitParams::new(Address::ZERO, vec![addr(3)], 1)).is_err());
    assert!(Registry::initialize(InitParams::new(addr(GOV), vec![addr(3)], 2)).is_err());
    assert!(Registry::initialize(
        InitParams::new(addr(GOV), vec![addr(3)], 1).with_versions(["v1", ""])
    )
    .is_err());

    let registry = Registry::initialize(
        InitParams::new(addr(GOV), vec![], 0).with_versions(["v1", "v2", "v3"]),
    )
    .unwrap();
    assert_eq!(registry.versions(), &["v1", "v2", "v3"]);
    assert!(registry.strategist_guild_members().is_empty());
}

// =============================================================================
// Catalogues
// =============================================================================

#[test]
fn test_catalogues_append_only() {
    let mut registry = registry();

    let receipt = registry.add_version("v3", addr(GOV)).unwrap();
    assert_eq!(
        receipt.events,
        vec![RegistryEvent::AddVersion { version: "v3".to_string() }]
    );
    assert!(registry.add_version("v3", addr(GOV)).unwrap().is_noop());
    assert_eq!(registry.version(2).unwrap(), "v3");
    assert!(matches!(
        registry.version(3),
        Err(RegistryError::IndexOutOfBounds { index: 3, len: 3 })
    ));

    assert!(registry.add_metadata("MyMetadata", addr(GOV)).is_err());
    assert!(registry.add_metadata(META, addr(DEV)).unwrap_err().is_unauthorized());
    registry.add_metadata(META, addr(GOV)).unwrap();
    assert_eq!(registry.production_metadata(0).unwrap(), META);
    assert_eq!(registry.production_metadatas().len(), 1);

    // Cross product widens with the catalogue
    assert_eq!(registry.production_vaults().len(), 3 * 4);
}
