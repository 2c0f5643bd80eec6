//! Event notification sinks.
//!
//! Every committed registry event is wrapped in an [`EventRecord`] and
//! handed to each sink the service was built with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use vault_registry::RegistryEvent;

/// A committed event with delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record ID
    pub id: String,
    /// Per-service position, starting at 1
    pub sequence: u64,
    /// Network the event was emitted on
    pub network: String,
    pub emitted_at: DateTime<Utc>,
    pub event: RegistryEvent,
}

impl EventRecord {
    pub fn new(network: impl Into<String>, sequence: u64, event: RegistryEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sequence,
            network: network.into(),
            emitted_at: Utc::now(),
            event,
        }
    }
}

/// Error types for sink delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Nobody is listening
    #[error("Sink closed: {0}")]
    Closed(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Receives committed registry events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Sink name for logs.
    fn name(&self) -> &str;

    /// Deliver one record.
    async fn publish(&self, record: &EventRecord) -> Result<(), SinkError>;
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<EventRecord> {
        self.records.read().await.clone()
    }

    /// Event names in delivery order.
    pub async fn event_names(&self) -> Vec<&'static str> {
        self.records
            .read()
            .await
            .iter()
            .map(|r| r.event.name())
            .collect()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Writes each record to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn publish(&self, record: &EventRecord) -> Result<(), SinkError> {
        let payload = serde_json::to_string(&record.event)
            .map_err(|e| SinkError::Delivery(e.to_string()))?;
        info!(
            network = %record.network,
            sequence = record.sequence,
            event = record.event.name(),
            payload = %payload,
            "Registry event"
        );
        Ok(())
    }
}

/// Fans records out to any number of subscribers.
pub struct BroadcastSink {
    sender: broadcast::Sender<EventRecord>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn publish(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.sender
            .send(record.clone())
            .map(|_| ())
            .map_err(|_| SinkError::Closed("no subscribers".to_string()))
    }
}
