//! Core types for the vault registry.
//!
//! Addresses are 20-byte account identifiers written as `0x`-prefixed hex.
//! Vault status is a four-step ladder ordered by its numeric value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RegistryError;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address. Never a valid role holder or key target.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| RegistryError::InvalidInput(format!("address missing 0x prefix: {s}")))?;

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| RegistryError::InvalidInput(format!("bad address {s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Production status of a vault.
///
/// Ordered by numeric value; demotion must strictly lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VaultStatus {
    /// Freshly promoted, limited exposure
    Experimental = 0,
    /// Guarded launch with deposit caps
    Guarded = 1,
    /// Fully open to deposits
    Open = 2,
    /// Being wound down
    Deprecated = 3,
}

impl VaultStatus {
    /// Every status in ascending numeric order.
    pub const ALL: [VaultStatus; 4] = [
        VaultStatus::Experimental,
        VaultStatus::Guarded,
        VaultStatus::Open,
        VaultStatus::Deprecated,
    ];

    /// Numeric value of the status.
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experimental => "experimental",
            Self::Guarded => "guarded",
            Self::Open => "open",
            Self::Deprecated => "deprecated",
        }
    }
}

impl TryFrom<u8> for VaultStatus {
    type Error = RegistryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Experimental),
            1 => Ok(Self::Guarded),
            2 => Ok(Self::Open),
            3 => Ok(Self::Deprecated),
            other => Err(RegistryError::InvalidInput(format!(
                "unknown vault status {other}"
            ))),
        }
    }
}

impl From<VaultStatus> for u8 {
    fn from(status: VaultStatus) -> Self {
        status.as_u8()
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vault in the production directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Vault address (identity key)
    pub address: Address,
    /// Release version the vault belongs to
    pub version: String,
    /// `name=...` metadata string
    pub metadata: String,
    /// Current production status
    pub status: VaultStatus,
}

/// A vault in an author's candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub address: Address,
    pub version: String,
    pub metadata: String,
}

/// One (version, status) cell of the production directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionBucket {
    pub version: String,
    pub status: VaultStatus,
    pub vaults: Vec<VaultEntry>,
}

impl ProductionBucket {
    /// Addresses in bucket order.
    pub fn addresses(&self) -> Vec<Address> {
        self.vaults.iter().map(|v| v.address).collect()
    }
}

/// One (version, status, metadata) cell of the production directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataBucket {
    pub version: String,
    pub status: VaultStatus,
    pub metadata: String,
    pub vaults: Vec<Address>,
}
