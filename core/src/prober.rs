//! Reachability checks.
//!
//! The pipeline only asks one question of an address: does it answer a single
//! echo request within the timeout? Every failure mode collapses to `false`.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Extra time granted to the ping process beyond its own timeout before it is killed.
const PROCESS_GRACE: Duration = Duration::from_secs(1);

#[async_trait]
pub trait ReachabilityProber: Send + Sync {
    /// Returns `true` when `addr` answered within `timeout`.
    async fn probe(&self, addr: Ipv4Addr, timeout: Duration) -> bool;
}

/// Probes by running the system `ping` utility once per address.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new("ping")
    }
}

impl PingProber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, addr: Ipv4Addr, timeout: Duration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(ping_args(addr, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ReachabilityProber for PingProber {
    async fn probe(&self, addr: Ipv4Addr, timeout: Duration) -> bool {
        let mut cmd = self.command(addr, timeout);

        match tokio::time::timeout(timeout + PROCESS_GRACE, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("could not run {} for {addr}: {e}", self.program);
                false
            }
            Err(_elapsed) => {
                debug!("{} for {addr} did not exit in time", self.program);
                false
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn ping_args(addr: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let millis = timeout.as_millis().max(1);
    vec!["-n".into(), "1".into(), "-w".into(), millis.to_string(), addr.to_string()]
}

#[cfg(target_os = "macos")]
fn ping_args(addr: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let millis = timeout.as_millis().max(1);
    vec!["-c".into(), "1".into(), "-W".into(), millis.to_string(), addr.to_string()]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn ping_args(addr: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let secs = timeout.as_secs().max(1);
    vec!["-c".into(), "1".into(), "-W".into(), secs.to_string(), addr.to_string()]
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
