//! Chunk header and footer codecs
//!
//! A chunk file is laid out as:
//!
//! - Header, 128 bytes, written once at creation:
//!   version (u8), chunk number (u32 LE), chunk start position (u64 LE),
//!   chunk end position (u64 LE), creation timestamp ms (i64 LE),
//!   zero padding.
//! - Data region: concatenated record frames.
//! - Footer, 128 bytes, written once at completion, at the last 128 bytes
//!   of the reserved file size: completed flag (u8), logical data size
//!   (u64 LE), SHA-256 content hash (32 bytes), zero padding.
//!
//! The gap between the end of the data region and the footer stays
//! zero-filled. A completed chunk is self-describing: header plus footer
//! are enough to reopen and verify it with no external state.

use std::io;

use chrono::{DateTime, TimeZone, Utc};

/// Reserved size of the chunk header.
pub const CHUNK_HEADER_SIZE: u64 = 128;

/// Reserved size of the chunk footer.
pub const CHUNK_FOOTER_SIZE: u64 = 128;

/// Current chunk format version.
pub const CHUNK_VERSION: u8 = 1;

/// Length of the footer content hash (SHA-256).
pub const CONTENT_HASH_LEN: usize = 32;

/// Fixed chunk file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub version: u8,
    /// Position of this chunk in the sequence
    pub chunk_number: u32,
    /// First global log position this chunk may hold
    pub chunk_start_position: u64,
    /// Last global log position this chunk may hold (inclusive)
    pub chunk_end_position: u64,
    pub created_at: DateTime<Utc>,
}

impl ChunkHeader {
    pub fn new(
        chunk_number: u32,
        chunk_start_position: u64,
        chunk_end_position: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: CHUNK_VERSION,
            chunk_number,
            chunk_start_position,
            chunk_end_position,
            created_at,
        }
    }

    /// Bytes of the data region this chunk can hold.
    pub fn data_capacity(&self) -> u64 {
        self.chunk_end_position - self.chunk_start_position + 1
    }

    /// Serializes to exactly `CHUNK_HEADER_SIZE` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CHUNK_HEADER_SIZE as usize];
        buf[0] = self.version;
        buf[1..5].copy_from_slice(&self.chunk_number.to_le_bytes());
        buf[5..13].copy_from_slice(&self.chunk_start_position.to_le_bytes());
        buf[13..21].copy_from_slice(&self.chunk_end_position.to_le_bytes());
        buf[21..29].copy_from_slice(&self.created_at.timestamp_millis().to_le_bytes());
        buf
    }

    /// Deserializes from a `CHUNK_HEADER_SIZE` block.
    pub fn deserialize(data: &[u8]) -> io::Result<Self> {
        if data.len() < CHUNK_HEADER_SIZE as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Chunk header block too short",
            ));
        }

        let version = data[0];
        if version != CHUNK_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported chunk version: {}", version),
            ));
        }

        let chunk_number = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let chunk_start_position = u64::from_le_bytes(data[5..13].try_into().unwrap());
        let chunk_end_position = u64::from_le_bytes(data[13..21].try_into().unwrap());
        let created_ms = i64::from_le_bytes(data[21..29].try_into().unwrap());

        if chunk_end_position <= chunk_start_position {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Chunk position range is inverted: [{}, {}]",
                    chunk_start_position, chunk_end_position
                ),
            ));
        }

        let created_at = Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Chunk creation timestamp out of range: {}", created_ms),
                )
            })?;

        Ok(Self {
            version,
            chunk_number,
            chunk_start_position,
            chunk_end_position,
            created_at,
        })
    }
}

/// Fixed chunk file footer, present only on completed chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFooter {
    /// Bytes of the data region actually holding records
    pub data_size: u64,
    /// SHA-256 over exactly `data_size` bytes of the data region
    pub content_hash: [u8; CONTENT_HASH_LEN],
}

impl ChunkFooter {
    pub fn new(data_size: u64, content_hash: [u8; CONTENT_HASH_LEN]) -> Self {
        Self {
            data_size,
            content_hash,
        }
    }

    /// Serializes to exactly `CHUNK_FOOTER_SIZE` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CHUNK_FOOTER_SIZE as usize];
        buf[0] = 1; // completed flag
        buf[1..9].copy_from_slice(&self.data_size.to_le_bytes());
        buf[9..9 + CONTENT_HASH_LEN].copy_from_slice(&self.content_hash);
        buf
    }

    /// Deserializes from a `CHUNK_FOOTER_SIZE` block.
    ///
    /// Returns `Ok(None)` when the completed flag is unset: the chunk was
    /// never completed (or the footer region is still zero-filled).
    pub fn deserialize(data: &[u8]) -> io::Result<Option<Self>> {
        if data.len() < CHUNK_FOOTER_SIZE as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Chunk footer block too short",
            ));
        }

        match data[0] {
            0 => Ok(None),
            1 => {
                let data_size = u64::from_le_bytes(data[1..9].try_into().unwrap());
                let mut content_hash = [0u8; CONTENT_HASH_LEN];
                content_hash.copy_from_slice(&data[9..9 + CONTENT_HASH_LEN]);
                Ok(Some(Self {
                    data_size,
                    content_hash,
                }))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid chunk completion flag: {}", other),
            )),
        }
    }
}
