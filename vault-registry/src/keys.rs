//! Keyed address directory.
//!
//! A key names exactly one address; an address may be named by many keys.
//! Both directions are kept in step on every mutation.

use std::collections::HashMap;

use crate::error::{RegistryError, Result};
use crate::indexed_set::IndexedSet;
use crate::types::Address;

/// Result of pointing a key at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChange {
    /// Key did not exist before
    Added,
    /// Key moved from the contained address
    Replaced(Address),
    /// Key already pointed at the address
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct KeyDirectory {
    keys: IndexedSet<String>,
    targets: HashMap<String, Address>,
    reverse: HashMap<Address, IndexedSet<String>>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `address`, dropping any previous reverse entry.
    pub fn set(&mut self, key: &str, address: Address) -> KeyChange {
        let change = match self.targets.get(key) {
            Some(current) if *current == address => return KeyChange::Unchanged,
            Some(current) => KeyChange::Replaced(*current),
            None => KeyChange::Added,
        };

        if let KeyChange::Replaced(previous) = change {
            self.unlink(key, &previous);
        }

        self.keys.insert(key.to_string());
        self.targets.insert(key.to_string(), address);
        self.reverse
            .entry(address)
            .or_default()
            .insert(key.to_string());
        change
    }

    /// Remove `key` in both directions. Returns the address it named.
    pub fn delete(&mut self, key: &str) -> Option<Address> {
        let address = self.targets.remove(key)?;
        self.keys.remove(&key.to_string());
        self.unlink(key, &address);
        Some(address)
    }

    fn unlink(&mut self, key: &str, address: &Address) {
        if let Some(names) = self.reverse.get_mut(address) {
            names.remove(&key.to_string());
            if names.is_empty() {
                self.reverse.remove(address);
            }
        }
    }

    pub fn address_of(&self, key: &str) -> Option<Address> {
        self.targets.get(key).copied()
    }

    /// First key naming `address`.
    pub fn key_of(&self, address: &Address) -> Option<&str> {
        self.reverse
            .get(address)
            .and_then(|names| names.get(0))
            .map(String::as_str)
    }

    /// Every key naming `address`.
    pub fn keys_of(&self, address: &Address) -> Vec<String> {
        self.reverse
            .get(address)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys and targets in directory order.
    pub fn entries(&self) -> Vec<(String, Address)> {
        self.keys
            .iter()
            .filter_map(|k| self.targets.get(k).map(|a| (k.clone(), *a)))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Keys naming each address, in reverse-index order, sorted by address.
    pub fn reverse_entries(&self) -> Vec<(Address, Vec<String>)> {
        let mut entries: Vec<(Address, Vec<String>)> = self
            .reverse
            .iter()
            .map(|(address, names)| (*address, names.as_slice().to_vec()))
            .collect();
        entries.sort_by_key(|(address, _)| *address);
        entries
    }

    /// Rebuild a directory from its forward entries and, when given, the
    /// per-address key lists that fix the reverse-index order.
    ///
    /// An empty `reverse` rebuilds the reverse index in forward order.
    pub fn from_parts(
        entries: impl IntoIterator<Item = (String, Address)>,
        reverse: Vec<(Address, Vec<String>)>,
    ) -> Result<Self> {
        let mut dir = Self::new();
        for (key, address) in entries {
            if dir.set(&key, address) != KeyChange::Added {
                return Err(RegistryError::InvalidInput(format!("key {key:?} listed twice")));
            }
        }
        if reverse.is_empty() {
            return Ok(dir);
        }

        if reverse.len() != dir.reverse.len() {
            return Err(RegistryError::InvalidInput(
                "reverse key index does not cover every address".to_string(),
            ));
        }
        for (address, names) in reverse {
            let ordered = IndexedSet::from(names);
            let consistent = dir.reverse.get(&address).is_some_and(|current| {
                current.len() == ordered.len() && ordered.iter().all(|k| current.contains(k))
            });
            if !consistent {
                return Err(RegistryError::InvalidInput(format!(
                    "reverse key index disagrees for {address}"
                )));
            }
            dir.reverse.insert(address, ordered);
        }
        Ok(dir)
    }
}
