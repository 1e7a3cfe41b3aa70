//! # Scout Common
//!
//! Types shared across the workspace: the process-wide [`config::DiscoveryConfig`]
//! and the range notation used to describe which addresses to discover.

pub mod config;
pub mod network;
