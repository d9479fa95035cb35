//! CLI argument definitions using clap
//!
//! Commands:
//! - tidelog verify --data-dir <path>
//! - tidelog dump --data-dir <path> [--limit <n>]
//! - tidelog stat --data-dir <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tidelog - An event-sourced transaction log storage engine
#[derive(Parser, Debug)]
#[command(name = "tidelog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify the content hash of every completed chunk
    Verify {
        /// Path to the log data directory
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Print every committed event in log order
    Dump {
        /// Path to the log data directory
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Stop after this many events
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print chunk and stream statistics
    Stat {
        /// Path to the log data directory
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
