//! Registration of identified hosts with the monitoring system.

use std::fmt;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use scout_common::config::DiscoveryConfig;
use thiserror::Error;
use tracing::info;

/// A host that answered both the reachability probe and the identity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub name: String,
    pub addr: Ipv4Addr,
}

impl HostRecord {
    pub fn new(name: impl Into<String>, addr: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.addr)
    }
}

#[derive(Debug, Error)]
#[error("failed to register {host}: {reason}")]
pub struct RegistrationError {
    pub host: String,
    pub reason: String,
}

#[async_trait]
pub trait HostRegistrar: Send + Sync {
    /// Creates the host in `group_id`, monitored through `proxy_id`, or
    /// confirms it already exists.
    async fn register(
        &self,
        record: &HostRecord,
        group_id: &str,
        proxy_id: &str,
    ) -> Result<(), RegistrationError>;
}

/// Registrar for the configured monitoring endpoint.
///
/// The backend's API is not wired up yet: every call is logged and reported
/// as successful.
#[derive(Debug, Clone)]
pub struct MonitoringRegistrar {
    endpoint: String,
    user: String,
}

impl MonitoringRegistrar {
    pub fn new(endpoint: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: user.into(),
        }
    }

    pub fn from_config(cfg: &DiscoveryConfig) -> Self {
        Self::new(cfg.monitoring_url.clone(), cfg.monitoring_user.clone())
    }
}

#[async_trait]
impl HostRegistrar for MonitoringRegistrar {
    async fn register(
        &self,
        record: &HostRecord,
        group_id: &str,
        proxy_id: &str,
    ) -> Result<(), RegistrationError> {
        // TODO: call host.get / host.create on the endpoint once its API contract is settled.
        info!(
            endpoint = %self.endpoint,
            user = %self.user,
            "Creating or verifying host {record} in group {group_id} via proxy {proxy_id}"
        );
        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
