//! CLI module for tidelog
//!
//! Provides command-line inspection of a log directory:
//! - verify: recompute completed chunks' content hashes
//! - dump: print committed events in log order
//! - stat: chunk and stream statistics

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{dump, run, stat, verify};
pub use errors::{CliError, CliResult};
