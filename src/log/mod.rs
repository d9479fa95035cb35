//! Chunked transaction log
//!
//! Presents the ordered chunk arena as one addressable append-only byte
//! space, owns chunk lifecycle (create → write → complete → cache), the
//! writer checkpoint, and whole-log sequential readers.
//!
//! # Invariants Enforced
//!
//! - One global writer: all appends serialize through the writer lock
//! - `chunk[i].end + 1 == chunk[i+1].start` across the whole arena
//! - A record never spans two chunks
//! - The writer checkpoint is authoritative at reopen

mod checkpoint;
mod chunked_log;
mod reader;

pub use checkpoint::{Checkpoint, CHECKPOINT_FILE};
pub use chunked_log::{ChunkedLog, CHUNK_FILE_EXTENSION};
pub use reader::{BackwardLogReader, ForwardLogReader, RecordAt};
