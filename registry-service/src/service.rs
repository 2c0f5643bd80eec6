//! RegistryService - serialized, observable access to one registry.
//!
//! Calls run under a write lock, so each is an atomic transition. The
//! snapshot of a committed call is taken under that lock and written in
//! commit order. Events are published to every sink after the lock is
//! released; a failing sink or snapshot write is logged and never rolls the
//! call back.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use vault_registry::{Address, Receipt, Registry, RegistrySnapshot};

use crate::audit::{AuditEntry, AuditLog, AuditOutcome};
use crate::call::{Call, CallRequest};
use crate::config::{NetworkConfig, ServiceConfig};
use crate::error::{Result, ServiceError};
use crate::sink::{EventRecord, EventSink};

/// Snapshot write counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistStatus {
    /// Snapshots written
    pub saved: u64,
    /// Snapshot writes that failed
    pub failures: u64,
    /// Error of the most recent failed write
    pub last_error: Option<String>,
}

/// One network's registry behind a lock, with sinks, audit and persistence.
pub struct RegistryService {
    network: String,
    registry: Arc<RwLock<Registry>>,
    sinks: Vec<Arc<dyn EventSink>>,
    audit: Option<Arc<AuditLog>>,
    sequence: AtomicU64,
    state_path: Option<PathBuf>,
    /// Held while a snapshot is written
    persist: Mutex<PersistStatus>,
}

impl RegistryService {
    /// Wrap an existing registry.
    pub fn new(network: impl Into<String>, registry: Registry) -> Self {
        Self {
            network: network.into(),
            registry: Arc::new(RwLock::new(registry)),
            sinks: Vec::new(),
            audit: None,
            sequence: AtomicU64::new(0),
            state_path: None,
            persist: Mutex::new(PersistStatus::default()),
        }
    }

    /// Build the service for `network`: restore its snapshot when one
    /// exists, otherwise initialize from `network_config`.
    pub async fn from_config(
        network: &str,
        network_config: &NetworkConfig,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let state_path = config.state_path(network);

        let registry = match &state_path {
            Some(path) if tokio::fs::try_exists(path).await? => {
                info!(network, path = %path.display(), "Restoring registry snapshot");
                load_snapshot(path).await?
            }
            _ => {
                info!(network, "Initializing registry from config");
                Registry::initialize(network_config.init_params())?
            }
        };

        let mut service = Self::new(network, registry);
        service.state_path = state_path;
        if config.audit.enabled {
            service.audit = Some(Arc::new(AuditLog::with_max_entries(
                config.audit.max_entries,
            )));
        }
        Ok(service)
    }

    /// Builder: add an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builder: attach an audit log.
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Builder: persist a snapshot to `path` after every committed call.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn audit(&self) -> Option<&Arc<AuditLog>> {
        self.audit.as_ref()
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// Submit a call as `caller`.
    ///
    /// Only a registry rejection is an `Err`. A committed call whose
    /// snapshot could not be written still returns its receipt; the failure
    /// shows up in [`RegistryService::persistence`].
    pub async fn submit(&self, caller: Address, call: Call) -> Result<Receipt> {
        let (receipt, records, pending_save) = {
            let mut registry = self.registry.write().await;
            let applied = call.apply(&mut registry, caller);
            match applied {
                Ok(receipt) => {
                    // Sequence numbers and snapshot writes follow commit order
                    let records = self.records_for(&receipt);
                    let pending_save = if receipt.changes_state() && self.state_path.is_some() {
                        let snapshot = registry.snapshot();
                        Some((snapshot, self.persist.lock().await))
                    } else {
                        None
                    };
                    (receipt, records, pending_save)
                }
                Err(e) => {
                    drop(registry);
                    debug!(network = %self.network, call = call.name(), error = %e, "Call rejected");
                    self.record_audit(caller, &call, AuditOutcome::Rejected { error: e.to_string() })
                        .await;
                    return Err(ServiceError::Registry(e));
                }
            }
        };

        if let Some((snapshot, mut status)) = pending_save {
            // Already logged and counted
            let _ = self.write_snapshot(&snapshot, &mut status).await;
        }

        self.record_audit(caller, &call, AuditOutcome::from_receipt(&receipt))
            .await;
        self.publish(&records).await;

        Ok(receipt)
    }

    /// Submit a [`CallRequest`].
    pub async fn submit_request(&self, request: CallRequest) -> Result<Receipt> {
        self.submit(request.caller, request.call).await
    }

    /// Run a read-only query against the current state.
    pub async fn query<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        let registry = self.registry.read().await;
        f(&registry)
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.registry.read().await.snapshot()
    }

    pub async fn state_hash(&self) -> Result<String> {
        Ok(self.registry.read().await.state_hash()?)
    }

    /// Number of events published so far.
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Snapshot write counters so far.
    pub async fn persistence(&self) -> PersistStatus {
        self.persist.lock().await.clone()
    }

    /// Write the current snapshot to the configured state path.
    pub async fn save(&self) -> Result<()> {
        if self.state_path.is_none() {
            return Ok(());
        }
        let (snapshot, mut status) = {
            let registry = self.registry.read().await;
            (registry.snapshot(), self.persist.lock().await)
        };
        self.write_snapshot(&snapshot, &mut status).await
    }

    async fn write_snapshot(
        &self,
        snapshot: &RegistrySnapshot,
        status: &mut PersistStatus,
    ) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        match write_atomic(path, snapshot).await {
            Ok(()) => {
                status.saved += 1;
                debug!(network = %self.network, path = %path.display(), "Snapshot saved");
                Ok(())
            }
            Err(e) => {
                status.failures += 1;
                status.last_error = Some(e.to_string());
                error!(network = %self.network, path = %path.display(), error = %e, "Snapshot write failed");
                Err(e)
            }
        }
    }

    fn records_for(&self, receipt: &Receipt) -> Vec<EventRecord> {
        receipt
            .events
            .iter()
            .map(|event| {
                let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                EventRecord::new(self.network.clone(), sequence, event.clone())
            })
            .collect()
    }

    async fn publish(&self, records: &[EventRecord]) {
        for record in records {
            let deliveries = self.sinks.iter().map(|sink| async move {
                (sink.name().to_string(), sink.publish(record).await)
            });
            for (sink, result) in futures::future::join_all(deliveries).await {
                if let Err(e) = result {
                    warn!(sink = %sink, sequence = record.sequence, error = %e, "Event delivery failed");
                }
            }
        }
    }

    async fn record_audit(&self, caller: Address, call: &Call, outcome: AuditOutcome) {
        if let Some(audit) = &self.audit {
            audit
                .record(AuditEntry::new(self.network.clone(), caller, call.name(), outcome))
                .await;
        }
    }
}

/// Write `snapshot` beside `path`, then rename it into place.
async fn write_atomic(path: &Path, snapshot: &RegistrySnapshot) -> Result<()> {
    let json = snapshot.to_json()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, json).await?;
    tokio::fs::rename(&staging, path).await?;
    Ok(())
}

/// Read and restore a snapshot file.
pub async fn load_snapshot(path: &Path) -> Result<Registry> {
    let json = tokio::fs::read_to_string(path).await?;
    let snapshot: RegistrySnapshot = serde_json::from_str(&json)?;
    Ok(Registry::restore(snapshot)?)
}
