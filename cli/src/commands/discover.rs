use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use scout_common::config::DiscoveryConfig;
use scout_core::discovery::DiscoveryService;
use tracing::{debug, info};

pub async fn discover(path: &Path, workers: Option<usize>) -> anyhow::Result<()> {
    info!("Loading configuration from {}", path.display());
    let cfg = load_config(path, workers)?;
    debug!("Configuration loaded: {cfg:?}");

    let service = DiscoveryService::from_config(Arc::new(cfg));

    let start_time: Instant = Instant::now();
    service.run().await;

    info!(
        "Discovery finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn load_config(path: &Path, workers: Option<usize>) -> anyhow::Result<DiscoveryConfig> {
    let mut cfg = DiscoveryConfig::load(path)
        .with_context(|| format!("cannot start discovery with {}", path.display()))?;

    if let Some(workers) = workers {
        cfg.workers = workers;
        cfg.validate().context("invalid --workers")?;
    }
    Ok(cfg)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
