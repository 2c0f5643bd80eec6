//! Candidate lists, the production directory and the append-only catalogues.

use std::collections::{BTreeMap, HashMap};

use crate::error::{RegistryError, Result};
use crate::indexed_set::IndexedSet;
use crate::types::{Address, CandidateEntry, VaultEntry, VaultStatus};

/// One author's candidates for one version.
#[derive(Debug, Clone, Default)]
struct CandidateList {
    order: IndexedSet<Address>,
    metadata: HashMap<Address, String>,
}

/// Per (version, author) staging lists.
#[derive(Debug, Clone, Default)]
pub struct CandidateLists {
    lists: BTreeMap<(String, Address), CandidateList>,
}

impl CandidateLists {
    /// Insert a candidate. Returns false if the author already lists it.
    pub fn insert(&mut self, version: &str, author: Address, vault: Address, metadata: &str) -> bool {
        let list = self
            .lists
            .entry((version.to_string(), author))
            .or_default();
        if !list.order.insert(vault) {
            return false;
        }
        list.metadata.insert(vault, metadata.to_string());
        true
    }

    /// Remove a candidate owned by `author`. Returns false if absent.
    pub fn remove(&mut self, version: &str, author: Address, vault: &Address) -> bool {
        let key = (version.to_string(), author);
        let Some(list) = self.lists.get_mut(&key) else {
            return false;
        };
        if !list.order.remove(vault) {
            return false;
        }
        list.metadata.remove(vault);
        if list.order.is_empty() {
            self.lists.remove(&key);
        }
        true
    }

    /// Candidates of `author` for `version`, in list order.
    pub fn list(&self, version: &str, author: Address) -> Vec<CandidateEntry> {
        let Some(list) = self.lists.get(&(version.to_string(), author)) else {
            return Vec::new();
        };
        list.order
            .iter()
            .map(|vault| CandidateEntry {
                address: *vault,
                version: version.to_string(),
                metadata: list.metadata.get(vault).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Every (author, entry) pair in deterministic order.
    pub fn all(&self) -> Vec<(Address, CandidateEntry)> {
        self.lists
            .keys()
            .flat_map(|(version, author)| {
                self.list(version, *author)
                    .into_iter()
                    .map(move |entry| (*author, entry))
            })
            .collect()
    }
}

/// Promoted vaults bucketed by (version, status).
#[derive(Debug, Clone, Default)]
pub struct ProductionDirectory {
    entries: HashMap<Address, VaultEntry>,
    buckets: BTreeMap<(String, VaultStatus), IndexedSet<Address>>,
}

impl ProductionDirectory {
    pub fn entry(&self, vault: &Address) -> Option<&VaultEntry> {
        self.entries.get(vault)
    }

    /// Place `entry` in its bucket, leaving any previous bucket.
    /// Returns the entry it replaced.
    pub fn place(&mut self, entry: VaultEntry) -> Option<VaultEntry> {
        let previous = self.remove(&entry.address);
        self.buckets
            .entry((entry.version.clone(), entry.status))
            .or_default()
            .insert(entry.address);
        self.entries.insert(entry.address, entry);
        previous
    }

    /// Take `vault` out of production.
    pub fn remove(&mut self, vault: &Address) -> Option<VaultEntry> {
        let entry = self.entries.remove(vault)?;
        let key = (entry.version.clone(), entry.status);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(vault);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        Some(entry)
    }

    /// Overwrite metadata in place. Returns false if `vault` is absent.
    pub fn set_metadata(&mut self, vault: &Address, metadata: &str) -> bool {
        match self.entries.get_mut(vault) {
            Some(entry) => {
                entry.metadata = metadata.to_string();
                true
            }
            None => false,
        }
    }

    /// Entries of one bucket, in bucket order.
    pub fn bucket(&self, version: &str, status: VaultStatus) -> Vec<&VaultEntry> {
        self.buckets
            .get(&(version.to_string(), status))
            .map(|set| set.iter().filter_map(|a| self.entries.get(a)).collect())
            .unwrap_or_default()
    }

    /// Every entry, bucket by bucket.
    pub fn all(&self) -> Vec<&VaultEntry> {
        self.buckets
            .values()
            .flat_map(|set| set.iter().filter_map(|a| self.entries.get(a)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only, index-addressable list of unique strings.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: IndexedSet<String>,
}

impl Catalogue {
    pub fn from_entries(entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Append `entry`. Returns false if already present.
    pub fn push(&mut self, entry: &str) -> bool {
        self.entries.insert(entry.to_string())
    }

    pub fn get(&self, index: usize) -> Result<&str> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or(RegistryError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            })
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(&entry.to_string())
    }

    pub fn entries(&self) -> &[String] {
        self.entries.as_slice()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
