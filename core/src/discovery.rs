//! # Network Discovery Service
//!
//! Implements the core "discover and register" use case.
//!
//! Every configured range is expanded into addresses and pushed onto a bounded
//! queue. A fixed pool of workers drains the queue, taking each address through
//! the same steps:
//!
//! 1. **Probe**: is the address alive at all?
//! 2. **Identify**: ask the host for its name.
//! 3. **Register**: hand the named host to the monitoring system.
//!
//! A failure at any step ends the work for that address only.

use std::net::Ipv4Addr;
use std::sync::Arc;

use scout_common::config::DiscoveryConfig;
use scout_common::network::range::RangeSpec;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, error, info, warn};

use crate::identity::{IdentityQuery, SnmpIdentityClient};
use crate::prober::{PingProber, ReachabilityProber};
use crate::registrar::{HostRecord, HostRegistrar, MonitoringRegistrar};

type Queue = Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>;

/// Where the processing of a single address ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No reply to the reachability probe.
    Unreachable,
    /// Alive, but the identity query failed.
    IdentityFailed,
    Registered,
    RegistrationFailed,
}

/// Application Service for Network Discovery.
///
/// Cloning is cheap: the configuration and the collaborators are shared.
#[derive(Clone)]
pub struct DiscoveryService {
    config: Arc<DiscoveryConfig>,
    prober: Arc<dyn ReachabilityProber>,
    identity: Arc<dyn IdentityQuery>,
    registrar: Arc<dyn HostRegistrar>,
}

impl DiscoveryService {
    pub fn new(
        config: Arc<DiscoveryConfig>,
        prober: Arc<dyn ReachabilityProber>,
        identity: Arc<dyn IdentityQuery>,
        registrar: Arc<dyn HostRegistrar>,
    ) -> Self {
        Self {
            config,
            prober,
            identity,
            registrar,
        }
    }

    /// Wires the system `ping`, the SNMP client and the monitoring registrar.
    pub fn from_config(config: Arc<DiscoveryConfig>) -> Self {
        let identity = SnmpIdentityClient::from_config(&config);
        let registrar = MonitoringRegistrar::from_config(&config);
        Self::new(
            config,
            Arc::new(PingProber::default()),
            Arc::new(identity),
            Arc::new(registrar),
        )
    }

    /// Discovers every range listed in the configuration.
    pub async fn run(&self) {
        let ranges = self.config.ranges.clone();
        self.run_ranges(&ranges).await;
    }

    /// Discovers `ranges` in order and returns once every worker has exited.
    ///
    /// Ranges that fail to parse are logged and skipped.
    pub async fn run_ranges(&self, ranges: &[String]) {
        let workers: usize = self.config.workers.max(1);
        info!("Starting discovery of {} ranges with {workers} workers", ranges.len());

        let (tx, rx) = work_queue(workers);
        let queue: Queue = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(worker(id, self.clone(), queue.clone()));
        }

        let queued = enqueue(&tx, ranges).await;
        drop(tx);
        debug!("Queued {queued} addresses");

        while let Some(res) = pool.join_next().await {
            if let Err(e) = res {
                error!("Discovery worker failed: {e}");
            }
        }
    }

    /// Takes one address through probe, identification and registration.
    pub async fn process(&self, addr: Ipv4Addr) -> Outcome {
        if !self.prober.probe(addr, self.config.ping_timeout()).await {
            debug!("{addr} did not answer the ping");
            return Outcome::Unreachable;
        }
        info!("{addr} is reachable");

        let name = match self.identity.query(addr).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Ping OK but identity query failed for {addr}: {e}");
                return Outcome::IdentityFailed;
            }
        };
        info!("{addr} identified as {name}");

        let record = HostRecord::new(name, addr);
        match self
            .registrar
            .register(&record, &self.config.group_id, &self.config.proxy_id)
            .await
        {
            Ok(()) => {
                info!("Registered {record}");
                Outcome::Registered
            }
            Err(e) => {
                error!("{e}");
                Outcome::RegistrationFailed
            }
        }
    }
}

/// The queue holds at most one address per worker.
fn work_queue(workers: usize) -> (mpsc::Sender<Ipv4Addr>, mpsc::Receiver<Ipv4Addr>) {
    mpsc::channel(workers)
}

/// Feeds every address of `ranges` into the queue, waiting while it is full.
/// Returns how many addresses were accepted.
async fn enqueue(tx: &mpsc::Sender<Ipv4Addr>, ranges: &[String]) -> usize {
    let mut queued = 0;
    for raw in ranges {
        let spec: RangeSpec = match raw.parse() {
            Ok(spec) => spec,
            Err(e) => {
                error!("Skipping range: {e}");
                continue;
            }
        };
        info!("Expanding range {} into {} addresses", raw.trim(), spec.len());

        for addr in spec.addresses() {
            if tx.send(addr).await.is_err() {
                error!("All workers have stopped, abandoning the remaining ranges");
                return queued;
            }
            queued += 1;
        }
    }
    queued
}

async fn worker(id: usize, service: DiscoveryService, queue: Queue) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(addr) = next else {
            break;
        };
        service
            .process(addr)
            .instrument(debug_span!("host", worker = id, %addr))
            .await;
    }
    debug!("Worker {id} finished");
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
