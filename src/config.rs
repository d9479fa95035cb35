//! Storage engine configuration
//!
//! Loaded from a JSON file or constructed in code. Chunk data capacity is
//! fixed for the lifetime of a log directory: position arithmetic depends
//! on it, so reopening with a different value is rejected by the header
//! adjacency checks rather than silently remapped.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default chunk data capacity: 256 MiB, matching the expectation that a
/// chunk is completed and sealed well before file-size limits matter.
pub const DEFAULT_CHUNK_DATA_SIZE: u64 = 256 * 1024 * 1024;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bytes of record data one chunk holds (excluding header and footer)
    pub chunk_data_size: u64,
    /// Recompute completed chunks' content hashes at open
    pub verify_hashes_on_open: bool,
    /// Mirror completed chunks into memory at open and at roll-over
    pub cache_completed_chunks: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_data_size: DEFAULT_CHUNK_DATA_SIZE,
            verify_hashes_on_open: true,
            cache_completed_chunks: false,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: StoreConfig = serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse config {}: {}", path.display(), e),
            )
        })?;
        config.validate().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        // Smallest frame is 9 bytes; anything under 1 KiB is useless.
        if self.chunk_data_size < 1024 {
            return Err(format!(
                "chunk_data_size must be at least 1024 bytes, got {}",
                self.chunk_data_size
            ));
        }
        Ok(())
    }
}
