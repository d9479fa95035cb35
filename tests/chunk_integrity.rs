//! Chunk Integrity Invariant Tests
//!
//! - A record's occupied range equals its encoded size, exactly
//! - An append fails iff the encoded frame exceeds the free space
//! - A completed chunk never accepts another append
//! - Hash verification passes on untouched files and fails after any
//!   byte inside the footer-declared data size is flipped
//! - Cache state never changes what a read returns

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use tidelog::chunk::{Chunk, CHUNK_HEADER_SIZE};
use tidelog::record::{LogRecord, PrepareFlags, PrepareRecord};

// =============================================================================
// Test Utilities
// =============================================================================

fn prepare_at(position: u64, data: Vec<u8>) -> LogRecord {
    LogRecord::Prepare(PrepareRecord::new(
        position,
        Uuid::new_v4(),
        Uuid::new_v4(),
        position,
        0,
        "integrity",
        -2,
        Utc.timestamp_millis_opt(946_728_000_000).single().unwrap(),
        PrepareFlags::single_write(),
        "evt",
        data,
        Vec::new(),
    ))
}

// =============================================================================
// Append size accounting
// =============================================================================

/// On success, the occupied range is exactly the encoded size.
#[test]
fn test_append_occupies_exactly_the_encoded_size() {
    let dir = TempDir::new().unwrap();
    let chunk = Chunk::create_new(&dir.path().join("c.tlog"), 4096, 0).unwrap();

    let record = prepare_at(0, vec![1; 100]);
    let result = chunk.try_append(&record).unwrap();

    assert!(result.success);
    assert_eq!(
        result.new_position - result.old_position,
        record.frame_size() as u64
    );
}

/// With N bytes free, an append fails iff the frame needs more than N.
#[test]
fn test_append_fails_exactly_at_capacity_boundary() {
    let probe = prepare_at(0, vec![7; 64]);
    let frame = probe.frame_size() as u64;

    // Capacity of exactly one frame: fits.
    {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), frame, 0).unwrap();
        let result = chunk.try_append(&prepare_at(0, vec![7; 64])).unwrap();
        assert!(result.success);
        assert_eq!(chunk.writer_position(), frame);

        // Zero bytes free now; the next append fails.
        let next = chunk.try_append(&prepare_at(frame, vec![7; 64])).unwrap();
        assert!(!next.success);
    }

    // One byte short: fails, positions unchanged.
    {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), frame - 1, 0).unwrap();
        let result = chunk.try_append(&prepare_at(0, vec![7; 64])).unwrap();
        assert!(!result.success);
        assert_eq!(result.old_position, 0);
        assert_eq!(result.new_position, 0);
        assert_eq!(chunk.writer_position(), 0);
    }
}

// =============================================================================
// Sealing
// =============================================================================

/// After complete(), every append fails with the sealed error.
#[test]
fn test_sealed_chunk_rejects_all_appends() {
    let dir = TempDir::new().unwrap();
    let chunk = Chunk::create_new(&dir.path().join("c.tlog"), 4096, 0).unwrap();

    chunk.try_append(&prepare_at(0, vec![1; 32])).unwrap();
    chunk.complete().unwrap();

    for _ in 0..3 {
        let err = chunk
            .try_append(&prepare_at(chunk.writer_position(), vec![2; 8]))
            .unwrap_err();
        assert!(err.is_sealed());
        assert_eq!(err.code().code(), "TIDE_CHUNK_SEALED");
    }
}

/// Completion must survive a reopen: the reopened chunk is read-only and
/// byte-for-byte identical to what was written.
#[test]
fn test_completed_chunk_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.tlog");

    let records: Vec<LogRecord> = {
        let chunk = Chunk::create_new(&path, 4096, 0).unwrap();
        let mut written = Vec::new();
        let mut position = 0u64;
        for i in 0..5u8 {
            let record = prepare_at(position, vec![i; 24]);
            let result = chunk.try_append(&record).unwrap();
            assert!(result.success);
            position = result.new_position;
            written.push(record);
        }
        chunk.flush().unwrap();
        chunk.complete().unwrap();
        written
    };

    let chunk = Chunk::from_completed_file(&path, true).unwrap();
    let mut position = 0u64;
    for expected in &records {
        let read = chunk.try_read_at(position).unwrap();
        assert!(read.success);
        assert_eq!(read.record.as_ref().unwrap(), expected);
        position = read.next_position;
    }
    assert_eq!(position, chunk.data_size());
}

// =============================================================================
// Hash verification
// =============================================================================

/// Flipping any byte within the footer-declared data size must fail
/// verification; bytes in the padding beyond it are not covered.
#[test]
fn test_any_flipped_data_byte_fails_verification() {
    for victim_offset in [0u64, 13, 77] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");

        {
            let chunk = Chunk::create_new(&path, 4096, 0).unwrap();
            chunk.try_append(&prepare_at(0, vec![5; 100])).unwrap();
            chunk.complete().unwrap();
        }

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            let at = CHUNK_HEADER_SIZE + victim_offset;
            let mut byte = [0u8; 1];
            file.seek(SeekFrom::Start(at)).unwrap();
            file.read_exact(&mut byte).unwrap();
            file.seek(SeekFrom::Start(at)).unwrap();
            file.write_all(&[byte[0] ^ 0x01]).unwrap();
        }

        let err = Chunk::from_completed_file(&path, true).unwrap_err();
        assert_eq!(
            err.code().code(),
            "TIDE_HASH_MISMATCH",
            "flip at offset {} must be caught",
            victim_offset
        );
        assert!(err.is_fatal());
    }
}

#[test]
fn test_untouched_file_passes_verification() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.tlog");

    {
        let chunk = Chunk::create_new(&path, 4096, 0).unwrap();
        chunk.try_append(&prepare_at(0, vec![5; 100])).unwrap();
        chunk.complete().unwrap();
    }

    // Repeated verification passes are stable.
    for _ in 0..2 {
        assert!(Chunk::from_completed_file(&path, true).is_ok());
    }
}

// =============================================================================
// Cache transparency
// =============================================================================

/// try_read_at returns bit-identical records whether cached or not, at
/// every position in the chunk.
#[test]
fn test_cache_is_transparent_at_every_position() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.tlog");

    {
        let chunk = Chunk::create_new(&path, 4096, 0).unwrap();
        let mut position = 0u64;
        for i in 0..6u8 {
            let record = prepare_at(position, vec![i; 40]);
            position = chunk.try_append(&record).unwrap().new_position;
        }
        chunk.complete().unwrap();
    }

    let chunk = Chunk::from_completed_file(&path, true).unwrap();

    let mut uncached = Vec::new();
    let mut position = 0u64;
    while position < chunk.data_size() {
        let read = chunk.try_read_at(position).unwrap();
        position = read.next_position;
        uncached.push(read);
    }

    chunk.cache_in_memory().unwrap();
    assert!(chunk.is_cached());

    let mut position = 0u64;
    for expected in &uncached {
        let read = chunk.try_read_at(position).unwrap();
        assert_eq!(&read, expected);
        position = read.next_position;
    }

    chunk.un_cache_from_memory();
    assert!(!chunk.is_cached());
    assert_eq!(chunk.try_read_at(0).unwrap(), uncached[0]);
}

/// Backward reads are cache-transparent too.
#[test]
fn test_backward_reads_match_after_uncache() {
    let dir = TempDir::new().unwrap();
    let chunk = Chunk::create_new(&dir.path().join("c.tlog"), 4096, 0).unwrap();

    let mut position = 0u64;
    for i in 0..4u8 {
        position = chunk
            .try_append(&prepare_at(position, vec![i; 16]))
            .unwrap()
            .new_position;
    }

    chunk.cache_in_memory().unwrap();
    let cached = chunk.try_read_before(position).unwrap();
    chunk.un_cache_from_memory();
    let uncached = chunk.try_read_before(position).unwrap();
    assert_eq!(cached, uncached);
}
