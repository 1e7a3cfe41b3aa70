//! # Scout Core
//!
//! The discovery engine. [`discovery::DiscoveryService`] drives a pool of
//! workers over the configured ranges; each step of the per-address pipeline
//! sits behind a trait so it can be swapped out:
//!
//! * [`prober::ReachabilityProber`]: is the address alive?
//! * [`identity::IdentityQuery`]: what does the host call itself?
//! * [`registrar::HostRegistrar`]: record the host in the monitoring system.

pub mod discovery;
pub mod identity;
pub mod prober;
pub mod registrar;
