pub mod discover;
pub mod expand;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use scout_common::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Discovers SNMP-speaking hosts and registers them for monitoring.")]
pub struct CommandLine {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the configured ranges and register every identified host
    #[command(alias = "d")]
    Discover {
        /// Path to the JSON configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Override the configured worker count
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Print the addresses the given ranges expand to, without sending anything
    #[command(alias = "e")]
    Expand {
        #[arg(required = true)]
        ranges: Vec<String>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
