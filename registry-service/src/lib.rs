//! Registry Service
//!
//! Async front for [`vault_registry::Registry`]:
//!
//! - **Service**: serialized calls behind a `tokio` lock
//! - **Sinks**: committed events fanned out to [`EventSink`] implementations
//! - **Audit**: bounded log of every call and its outcome
//! - **Persistence**: JSON snapshots per network
//! - **Deployments**: one service per configured network
//!
//! # Example
//!
//! ```ignore
//! use registry_service::{Call, Deployments, ServiceConfig};
//!
//! let deployments = Deployments::new(ServiceConfig::from_file("registry.yaml")?);
//! let eth = deployments.deploy("eth").await?;
//! eth.submit(gov, Call::AddVersion { version: "v3".into() }).await?;
//! ```

pub mod audit;
pub mod call;
pub mod config;
pub mod deployments;
pub mod error;
pub mod service;
pub mod sink;

// Re-export main types
pub use audit::{AuditEntry, AuditLog, AuditOutcome, AuditStats};
pub use call::{parse_batch, Call, CallRequest};
pub use config::{AuditConfig, NetworkConfig, ServiceConfig};
pub use deployments::Deployments;
pub use error::{Result, ServiceError};
pub use service::{load_snapshot, PersistStatus, RegistryService};
pub use sink::{BroadcastSink, EventRecord, EventSink, MemorySink, SinkError, TracingSink};
