//! CLI command implementations
//!
//! All commands open the log read-only in spirit: they never append. The
//! data directory stays usable by the engine afterwards.

use std::path::Path;
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::config::StoreConfig;
use crate::index::ReadIndex;
use crate::log::{ChunkedLog, CHUNK_FILE_EXTENSION};
use crate::observability::{Logger, Severity};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parses arguments and dispatches to the requested command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match cli.command {
        Command::Verify { data_dir } => verify(&data_dir),
        Command::Dump { data_dir, limit } => dump(&data_dir, limit),
        Command::Stat { data_dir } => stat(&data_dir),
    }
}

/// Recomputes the content hash of every completed chunk in the directory.
pub fn verify(data_dir: &Path) -> CliResult<()> {
    let mut chunk_files: Vec<_> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(CHUNK_FILE_EXTENSION))
        .collect();
    chunk_files.sort();

    let mut completed = 0usize;
    let mut failed = 0usize;

    for path in &chunk_files {
        if !Chunk::file_is_completed(path)? {
            println!("{}: ongoing, skipped", path.display());
            continue;
        }
        completed += 1;
        match Chunk::from_completed_file(path, true) {
            Ok(chunk) => {
                println!(
                    "{}: ok ({} bytes of records)",
                    path.display(),
                    chunk.data_size()
                );
            }
            Err(e) => {
                failed += 1;
                Logger::log_stderr(
                    Severity::Error,
                    "chunk_verification_failed",
                    &[("path", &path.display().to_string()), ("error", &e.to_string())],
                );
            }
        }
    }

    if failed > 0 {
        return Err(CliError::VerificationFailed {
            failed,
            total: completed,
        });
    }

    println!("{} completed chunks verified", completed);
    Ok(())
}

/// Prints every committed event in global log order.
pub fn dump(data_dir: &Path, limit: Option<usize>) -> CliResult<()> {
    let log = Arc::new(ChunkedLog::open(data_dir, read_only_config())?);
    let index = ReadIndex::build(log)?;

    let mut position = 0u64;
    let mut printed = 0usize;
    let limit = limit.unwrap_or(usize::MAX);

    loop {
        let batch = limit.saturating_sub(printed).min(512);
        if batch == 0 {
            break;
        }
        let slice = index.read_all_events_forward(position, batch)?;
        if slice.records.is_empty() {
            break;
        }
        for event in &slice.records {
            println!(
                "{:>12}  {}#{}  {}  {} bytes",
                event.log_position,
                event.event_stream_id,
                event.event_number,
                event.event_type,
                event.data.len()
            );
            printed += 1;
        }
        position = slice.next_position;
    }

    println!("{} events", printed);
    Ok(())
}

/// Prints chunk and stream statistics for the directory.
pub fn stat(data_dir: &Path) -> CliResult<()> {
    let log = Arc::new(ChunkedLog::open(data_dir, read_only_config())?);
    let chunks = log.chunks();
    let index = ReadIndex::build(log.clone())?;

    println!("chunks:          {}", chunks.len());
    for chunk in &chunks {
        println!(
            "  chunk {:>6}: [{}, {}] {} bytes of records{}",
            chunk.chunk_number(),
            chunk.chunk_start_position(),
            chunk.chunk_end_position(),
            chunk.data_size(),
            if chunk.is_read_only() { ", completed" } else { "" }
        );
    }
    println!("writer position: {}", log.writer_position());
    println!("streams:         {}", index.stream_count());
    Ok(())
}

// Inspection must not stall on hash checks of very large logs; `verify`
// exists for that.
fn read_only_config() -> StoreConfig {
    StoreConfig {
        verify_hashes_on_open: false,
        cache_completed_chunks: false,
        ..StoreConfig::default()
    }
}
