//! CLI error types

use thiserror::Error;

use crate::chunk::ChunkError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Storage(#[from] ChunkError),

    #[error("Verification failed: {failed} of {total} completed chunks are damaged")]
    VerificationFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
