//! Vault Registry
//!
//! State machine for a registry of yield vaults:
//!
//! - **Candidate lists**: per-author, per-version staging lists
//! - **Production directory**: vaults bucketed by (version, status)
//! - **Key directory**: named addresses with a reverse index
//! - **Roles**: governance, dev-governance, strategist guild, developer
//! - **Catalogues**: append-only version and metadata lists
//!
//! # Vault lifecycle
//!
//! ```text
//!            promote(s)                 demote(t), t < s
//!  absent ─────────────▶ bucket(v, s) ─────────────────▶ bucket(v, t)
//!    ▲                        │
//!    └────────── purge ───────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vault_registry::{InitParams, Registry, VaultStatus};
//!
//! let mut registry = Registry::initialize(InitParams::new(gov, guild, 2))?;
//! let receipt = registry.promote(vault, "v1", "name=BTC-CVX", VaultStatus::Open, gov)?;
//! assert!(receipt.event("PromoteVault").is_some());
//! ```

pub mod directory;
pub mod error;
pub mod events;
pub mod indexed_set;
pub mod keys;
pub mod metadata;
pub mod quorum;
pub mod registry;
pub mod roles;
pub mod snapshot;
pub mod types;

// Re-export main types
pub use error::{RegistryError, Result};
pub use events::{ApprovalStatus, Receipt, RegistryEvent};
pub use indexed_set::IndexedSet;
pub use registry::{InitParams, Registry, DEFAULT_VERSIONS};
pub use roles::{Operation, Role, StrategistGuild};
pub use snapshot::RegistrySnapshot;
pub use types::*;
