//! Chunk subsystem: one append-only segment file of the transaction log
//!
//! A chunk owns a fixed-size header, a growable data region of record
//! frames, and, once completed, a footer carrying the logical data size
//! and a content hash over exactly that many bytes.
//!
//! # Invariants Enforced
//!
//! - A record's serialized bytes never change after the append returns
//! - The writer position is published only after bytes are placed
//! - A completed chunk never accepts another append
//! - Reads return identical bytes whether the chunk is cached or not
//! - A completed chunk is self-describing and independently verifiable

mod chunk;
mod errors;
mod header;

pub use chunk::{Chunk, ReadResult, RecordWriteResult};
pub use errors::{ChunkError, ChunkErrorCode, ChunkResult, Severity};
pub use header::{
    ChunkFooter, ChunkHeader, CHUNK_FOOTER_SIZE, CHUNK_HEADER_SIZE, CHUNK_VERSION,
    CONTENT_HASH_LEN,
};
