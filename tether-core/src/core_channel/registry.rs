//! Channel service registry
//!
//! Owns the configured transport backends, starts and stops them as their
//! enablement changes, fans their discovery events into one channel and
//! routes directed identify requests by locator scheme.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::errors::{ChannelError, ChannelResult};
use super::service::{locator_scheme, ChannelService, ServiceEvent};

/// Introspection snapshot of one configured backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub enabled: bool,
    pub running: bool,
}

struct ServiceEntry {
    service: Arc<dyn ChannelService>,
    enabled: bool,
    running: bool,
}

/// Registry of transport backends with independent enablement
pub struct ChannelServiceRegistry {
    services: HashMap<String, ServiceEntry>,
    events: mpsc::Sender<ServiceEvent>,
    started: bool,
}

impl ChannelServiceRegistry {
    /// Create a registry delivering discovery events on `events`
    pub fn new(events: mpsc::Sender<ServiceEvent>) -> Self {
        ChannelServiceRegistry {
            services: HashMap::new(),
            events,
            started: false,
        }
    }

    /// Register a backend; its name must be unique
    pub fn register(
        &mut self,
        service: Arc<dyn ChannelService>,
        enabled: bool,
    ) -> ChannelResult<()> {
        let name = service.name().to_string();
        if self.services.contains_key(&name) {
            return Err(ChannelError::DuplicateService(name));
        }

        debug!(service = %name, enabled, "Registered channel service");
        self.services.insert(
            name,
            ServiceEntry {
                service,
                enabled,
                running: false,
            },
        );
        Ok(())
    }

    /// Start every currently-enabled backend
    ///
    /// A backend failing to start is isolated: it is logged and left
    /// stopped while the others proceed.
    pub async fn start(&mut self) {
        self.started = true;
        for (name, entry) in self.services.iter_mut() {
            if !entry.enabled || entry.running {
                continue;
            }
            match entry.service.start(self.events.clone()).await {
                Ok(()) => {
                    entry.running = true;
                    info!(service = %name, "Channel service started");
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "Channel service failed to start");
                }
            }
        }
    }

    /// Stop every running backend
    pub async fn stop(&mut self) {
        self.started = false;
        for (name, entry) in self.services.iter_mut() {
            if entry.running {
                entry.service.stop().await;
                entry.running = false;
                info!(service = %name, "Channel service stopped");
            }
        }
    }

    /// React to an external enable/disable toggle for one backend
    ///
    /// Starts or stops exactly the affected instance; the others are not
    /// disturbed.
    pub async fn set_enabled(&mut self, name: &str, enabled: bool) -> ChannelResult<()> {
        let entry = self
            .services
            .get_mut(name)
            .ok_or_else(|| ChannelError::UnknownService(name.to_string()))?;

        entry.enabled = enabled;

        if enabled && self.started && !entry.running {
            match entry.service.start(self.events.clone()).await {
                Ok(()) => {
                    entry.running = true;
                    info!(service = %name, "Channel service started");
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "Channel service failed to start");
                }
            }
        } else if !enabled && entry.running {
            entry.service.stop().await;
            entry.running = false;
            info!(service = %name, "Channel service stopped");
        }

        Ok(())
    }

    /// Dispatch an identify request
    ///
    /// Without a target the request is broadcast to every running backend;
    /// with a target only the backend routing its scheme is invoked.
    pub async fn identify(&self, target: Option<&str>) -> ChannelResult<()> {
        match target {
            None => {
                for (name, entry) in self.services.iter() {
                    if !entry.running {
                        continue;
                    }
                    if let Err(e) = entry.service.identify(None).await {
                        warn!(service = %name, error = %e, "Identify failed");
                    }
                }
                Ok(())
            }
            Some(locator) => {
                let scheme = locator_scheme(locator)
                    .ok_or_else(|| ChannelError::InvalidLocator(locator.to_string()))?;

                let entry = self
                    .services
                    .values()
                    .find(|e| e.running && e.service.schemes().iter().any(|s| s == scheme))
                    .ok_or_else(|| ChannelError::UnsupportedTarget(scheme.to_string()))?;

                entry.service.identify(Some(locator)).await
            }
        }
    }

    /// Snapshot of every configured backend
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let mut out: Vec<ServiceDescriptor> = self
            .services
            .iter()
            .map(|(name, entry)| ServiceDescriptor {
                name: name.clone(),
                enabled: entry.enabled,
                running: entry.running,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Whether the named backend is currently running
    pub fn is_running(&self, name: &str) -> bool {
        self.services.get(name).map(|e| e.running).unwrap_or(false)
    }
}
