//! Error types for registry operations.
//!
//! Every failing call leaves registry state untouched: validation and
//! authorization run before any mutation.

use crate::types::{Address, VaultStatus};

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Caller does not hold a role permitted for the operation
    #[error("!auth: {caller} may not {operation}")]
    Unauthorized {
        caller: Address,
        operation: &'static str,
    },

    /// Vault is not in the production directory
    #[error("Vault not in production: {0}")]
    VaultNotFound(Address),

    /// Key is not in the key directory
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Demotion that does not strictly lower the status
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: VaultStatus, to: VaultStatus },

    /// Metadata does not match the `name=...,key=value` grammar
    #[error("Invalid name: {0}")]
    InvalidMetadata(String),

    /// Malformed argument (zero address, bad threshold, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Indexed lookup past the end of a list
    #[error("Index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

impl RegistryError {
    /// Whether the failure came from the role check.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
