//! # Discovery Configuration
//!
//! The configuration is a JSON document loaded once at startup. It is never
//! mutated afterwards and is shared read-only with every worker.
//!
//! Keys written for the older Zabbix-specific layout (`zabbix_url`,
//! `snmp_community`, ...) are still accepted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "discovery.conf";

const DEFAULT_PING_TIMEOUT: u64 = 1;
const DEFAULT_SNMP_TIMEOUT: u64 = 2;
const DEFAULT_SNMP_PORT: u16 = 161;
const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Endpoint of the monitoring system hosts are registered with.
    #[serde(default, alias = "zabbix_url")]
    pub monitoring_url: String,
    #[serde(default, alias = "zabbix_user")]
    pub monitoring_user: String,
    #[serde(default, alias = "zabbix_pass")]
    pub monitoring_password: String,
    /// Group every discovered host is placed in.
    #[serde(default, alias = "zabbix_group_id")]
    pub group_id: String,
    /// Proxy that will monitor the discovered hosts.
    #[serde(default, alias = "zabbix_proxy_id")]
    pub proxy_id: String,

    /// SNMP v2c read community.
    #[serde(alias = "snmp_community")]
    pub community: String,
    #[serde(default = "default_snmp_port")]
    pub snmp_port: u16,

    /// Seconds to wait for a ping reply.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    /// Seconds to wait for each SNMP response.
    #[serde(default = "default_snmp_timeout")]
    pub snmp_timeout: u64,

    /// Size of the worker pool. Must be at least 1.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// CIDR blocks or dashed-octet ranges, discovered in this order.
    #[serde(default)]
    pub ranges: Vec<String>,
}

fn default_ping_timeout() -> u64 {
    DEFAULT_PING_TIMEOUT
}

fn default_snmp_timeout() -> u64 {
    DEFAULT_SNMP_TIMEOUT
}

fn default_snmp_port() -> u16 {
    DEFAULT_SNMP_PORT
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl DiscoveryConfig {
    /// Reads and validates the configuration at `path`.
    ///
    /// Any failure is fatal to the run, nothing is partially loaded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: DiscoveryConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.snmp_timeout == 0 {
            return Err(ConfigError::Invalid("snmp_timeout must be at least 1 second".into()));
        }
        Ok(())
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }

    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_secs(self.snmp_timeout)
    }
}

impl fmt::Debug for DiscoveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryConfig")
            .field("monitoring_url", &self.monitoring_url)
            .field("monitoring_user", &self.monitoring_user)
            .field("monitoring_password", &redact(&self.monitoring_password))
            .field("group_id", &self.group_id)
            .field("proxy_id", &self.proxy_id)
            .field("community", &redact(&self.community))
            .field("snmp_port", &self.snmp_port)
            .field("ping_timeout", &self.ping_timeout)
            .field("snmp_timeout", &self.snmp_timeout)
            .field("workers", &self.workers)
            .field("ranges", &self.ranges)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
