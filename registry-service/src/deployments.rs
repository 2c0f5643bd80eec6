//! Registry deployments across networks.
//!
//! Each configured network gets at most one [`RegistryService`]. Sinks
//! registered here are attached to every service deployed afterwards.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::service::RegistryService;
use crate::sink::EventSink;

pub struct Deployments {
    config: ServiceConfig,
    services: DashMap<String, Arc<RegistryService>>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Deployments {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            services: DashMap::new(),
            sinks: Vec::new(),
        }
    }

    /// Builder: attach a sink to every deployed service.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Deploy the registry for `network`. Fails if it is already running.
    pub async fn deploy(&self, network: &str) -> Result<Arc<RegistryService>> {
        let network_config = self
            .config
            .network(network)
            .ok_or_else(|| ServiceError::UnknownNetwork(network.to_string()))?;
        if self.services.contains_key(network) {
            return Err(ServiceError::AlreadyDeployed(network.to_string()));
        }

        let mut service = RegistryService::from_config(network, network_config, &self.config).await?;
        for sink in &self.sinks {
            service = service.with_sink(Arc::clone(sink));
        }
        let service = Arc::new(service);

        // A concurrent deploy of the same network may have won the race
        match self.services.entry(network.to_string()) {
            Entry::Occupied(_) => Err(ServiceError::AlreadyDeployed(network.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&service));
                info!(network, "Registry deployed");
                Ok(service)
            }
        }
    }

    /// Deploy every configured network that is not running yet.
    pub async fn deploy_all(&self) -> Result<Vec<Arc<RegistryService>>> {
        let mut deployed = Vec::new();
        for network in self.config.networks.keys() {
            if !self.services.contains_key(network) {
                deployed.push(self.deploy(network).await?);
            }
        }
        Ok(deployed)
    }

    pub fn get(&self, network: &str) -> Result<Arc<RegistryService>> {
        self.services
            .get(network)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ServiceError::NotDeployed(network.to_string()))
    }

    /// Names of deployed networks, sorted.
    pub fn networks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_deployed(&self, network: &str) -> bool {
        self.services.contains_key(network)
    }
}
