//! Writer checkpoint file
//!
//! `writer.chk` holds the durable global writer position as
//! `[position u64 LE][crc32 u32 LE]`, rewritten in place and fsynced on
//! every log flush. On restart the checkpoint is authoritative: bytes in
//! the ongoing chunk beyond it are unreachable and get overwritten by
//! subsequent appends.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::chunk::{ChunkError, ChunkResult};

/// Name of the checkpoint file inside the log directory.
pub const CHECKPOINT_FILE: &str = "writer.chk";

const CHECKPOINT_LEN: usize = 8 + 4;

/// Durable, CRC-protected position marker.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    file: File,
    position: u64,
}

impl Checkpoint {
    /// Creates a fresh checkpoint at position 0.
    pub fn create(dir: &Path) -> ChunkResult<Self> {
        let path = dir.join(CHECKPOINT_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to create checkpoint file: {}", path.display()),
                    e,
                )
            })?;

        let mut checkpoint = Self {
            path,
            file,
            position: 0,
        };
        checkpoint.write(0)?;
        Ok(checkpoint)
    }

    /// Opens an existing checkpoint and validates its CRC.
    pub fn open(dir: &Path) -> ChunkResult<Self> {
        let path = dir.join(CHECKPOINT_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to open checkpoint file: {}", path.display()),
                    e,
                )
            })?;

        let mut buf = [0u8; CHECKPOINT_LEN];
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to read checkpoint file: {}", path.display()),
                    e,
                )
            })?;

        let position = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let stored_crc = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let computed_crc = crc32fast::hash(&buf[0..8]);

        if stored_crc != computed_crc {
            return Err(ChunkError::checkpoint_corrupt(format!(
                "Checkpoint CRC mismatch: computed {:08x}, stored {:08x}",
                computed_crc, stored_crc
            )));
        }

        Ok(Self {
            path,
            file,
            position,
        })
    }

    /// The last durably recorded writer position.
    pub fn read(&self) -> u64 {
        self.position
    }

    /// Records a new writer position durably. The in-memory value changes
    /// only after the fsync succeeds.
    pub fn write(&mut self, position: u64) -> ChunkResult<()> {
        let mut buf = [0u8; CHECKPOINT_LEN];
        buf[0..8].copy_from_slice(&position.to_le_bytes());
        let crc = crc32fast::hash(&buf[0..8]);
        buf[8..12].copy_from_slice(&crc.to_le_bytes());

        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(&buf))
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to write checkpoint: {}", self.path.display()),
                    e,
                )
            })?;

        self.file.sync_data().map_err(|e| {
            ChunkError::io_failed(
                format!("fsync failed on checkpoint: {}", self.path.display()),
                e,
            )
        })?;

        self.position = position;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
