//! Error types for the registry service.

use vault_registry::RegistryError;

/// Error types for service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The registry rejected the call
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Snapshot file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// No network with this name is configured
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// The network already has a running registry
    #[error("Network already deployed: {0}")]
    AlreadyDeployed(String),

    /// The network has not been deployed yet
    #[error("Network not deployed: {0}")]
    NotDeployed(String),
}

impl ServiceError {
    /// The registry error behind this failure, if any.
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
