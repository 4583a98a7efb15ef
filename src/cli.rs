use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ibgw")]
#[command(about = "Manage the local Interactive Brokers Client Portal Gateway")]
pub struct Cli {
    /// Settings file path (defaults to ib-gateway.yaml found upward from cwd)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Gateway installation directory (overrides settings and IB_GATEWAY_DIR)
    #[arg(short, long)]
    pub gateway_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start (or adopt) a gateway and wait for it to become ready
    Start {
        /// Fast-path boot: adopt an existing gateway if one is found,
        /// otherwise kick off startup in the background and return at once
        #[arg(short, long)]
        quick: bool,
    },

    /// Show manager and gateway state
    Status {
        /// Emit JSON instead of human-readable output
        #[arg(long)]
        json: bool,

        /// Also print the tail of the spawned gateway's output
        #[arg(long)]
        logs: bool,
    },

    /// Forget the gateway without killing it
    Stop,

    /// Print the gateway's base URL
    Url,

    /// Check the installation layout and report each expectation
    Doctor,

    /// Keep the brokerage session alive (one tickle round-trip)
    Tickle,
}
