//! A single append-only segment file of the transaction log
//!
//! Lifecycle: created empty and writable, receives appends (each
//! independently flushable), then `complete()` freezes it: the footer is
//! written with the logical data size and a SHA-256 digest over exactly
//! that many bytes, and from then on the chunk is read-only. A completed
//! chunk is independently reopenable and verifiable.
//!
//! Concurrency: one writer (the chunked log serializes all appends),
//! any number of concurrent readers. The writer publishes the writer
//! position only after the bytes are placed, so a reader can never
//! address a partially written frame. The in-memory cache is an
//! atomically swapped buffer: a read sees fully cached or fully on-disk
//! bytes, never a torn mix.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::errors::{ChunkError, ChunkResult};
use super::header::{
    ChunkFooter, ChunkHeader, CHUNK_FOOTER_SIZE, CHUNK_HEADER_SIZE, CONTENT_HASH_LEN,
};
use crate::record::{LogRecord, FRAME_SIZE_LEN, MAX_RECORD_SIZE};

/// Outcome of a `try_append`.
///
/// `success == false` means the record did not fit; positions are the
/// unchanged writer position and the caller must roll to a new chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWriteResult {
    pub success: bool,
    /// Writer position before the append
    pub old_position: u64,
    /// Writer position after the append (exclusive end of the record)
    pub new_position: u64,
}

impl RecordWriteResult {
    pub fn successful(old_position: u64, new_position: u64) -> Self {
        Self {
            success: true,
            old_position,
            new_position,
        }
    }

    pub fn failed(position: u64) -> Self {
        Self {
            success: false,
            old_position: position,
            new_position: position,
        }
    }
}

/// Outcome of a positioned read.
///
/// `success == false` means the position is beyond the readable region;
/// corrupt data is an error, not a failed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub success: bool,
    pub record: Option<LogRecord>,
    /// Position to continue scanning from (forward: end of this record;
    /// backward: start of this record)
    pub next_position: u64,
}

impl ReadResult {
    pub fn found(record: LogRecord, next_position: u64) -> Self {
        Self {
            success: true,
            record: Some(record),
            next_position,
        }
    }

    pub fn out_of_range(position: u64) -> Self {
        Self {
            success: false,
            record: None,
            next_position: position,
        }
    }
}

/// One segment file of the transaction log.
#[derive(Debug)]
pub struct Chunk {
    path: PathBuf,
    header: ChunkHeader,
    /// Total reserved file size: header + data capacity + footer
    reserved_size: u64,
    /// None once disposed
    file: Mutex<Option<File>>,
    /// Local offset of the next append; published after bytes are placed
    write_position: AtomicU64,
    flushed_position: AtomicU64,
    /// Present once completed; makes the chunk read-only
    footer: RwLock<Option<ChunkFooter>>,
    /// Mirrored prefix of the data region
    cache: RwLock<Option<Arc<Vec<u8>>>>,
}

impl Chunk {
    /// Creates a new writable chunk file of reserved size.
    ///
    /// The file is preallocated to header + `data_capacity` + footer, the
    /// header is written and synced, and the writer starts at local
    /// offset 0 (the first record lands immediately after the header).
    ///
    /// Chunk N owns global positions `[N * capacity, (N+1) * capacity - 1]`.
    pub fn create_new(path: &Path, data_capacity: u64, chunk_number: u32) -> ChunkResult<Chunk> {
        let chunk_start = chunk_number as u64 * data_capacity;
        let header = ChunkHeader::new(
            chunk_number,
            chunk_start,
            chunk_start + data_capacity - 1,
            Utc::now(),
        );
        let reserved_size = CHUNK_HEADER_SIZE + data_capacity + CHUNK_FOOTER_SIZE;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to create chunk file: {}", path.display()),
                    e,
                )
            })?;

        file.set_len(reserved_size).map_err(|e| {
            ChunkError::io_failed(
                format!("Failed to reserve chunk file size: {}", path.display()),
                e,
            )
        })?;

        file.write_all(&header.serialize()).map_err(|e| {
            ChunkError::io_failed(
                format!("Failed to write chunk header: {}", path.display()),
                e,
            )
        })?;

        file.sync_all().map_err(|e| {
            ChunkError::io_failed(
                format!("fsync failed after chunk creation: {}", path.display()),
                e,
            )
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            reserved_size,
            file: Mutex::new(Some(file)),
            write_position: AtomicU64::new(0),
            flushed_position: AtomicU64::new(0),
            footer: RwLock::new(None),
            cache: RwLock::new(None),
        })
    }

    /// Reopens a previously completed chunk.
    ///
    /// With `verify_hash` set, the digest is recomputed over the
    /// footer-declared data size; disagreement is `TIDE_HASH_MISMATCH`.
    /// This is the integrity check run on startup.
    pub fn from_completed_file(path: &Path, verify_hash: bool) -> ChunkResult<Chunk> {
        let mut file = OpenOptions::new().read(true).open(path).map_err(|e| {
            ChunkError::io_failed(format!("Failed to open chunk file: {}", path.display()), e)
        })?;

        let reserved_size = file
            .metadata()
            .map_err(|e| ChunkError::io_failed("Failed to read chunk metadata", e))?
            .len();

        let header = Self::read_header(&mut file, path)?;

        let expected_size = CHUNK_HEADER_SIZE + header.data_capacity() + CHUNK_FOOTER_SIZE;
        if reserved_size != expected_size {
            return Err(ChunkError::record_corrupt(format!(
                "Chunk file size {} does not match reserved size {}",
                reserved_size, expected_size
            )));
        }

        let footer = Self::read_footer(&mut file, reserved_size)?.ok_or_else(|| {
            ChunkError::record_corrupt(format!(
                "Chunk {} was never completed",
                header.chunk_number
            ))
        })?;

        if footer.data_size > header.data_capacity() {
            return Err(ChunkError::record_corrupt(format!(
                "Footer data size {} exceeds chunk capacity {}",
                footer.data_size,
                header.data_capacity()
            )));
        }

        if verify_hash {
            let computed = Self::digest_data_region(&file, footer.data_size)?;
            if computed != footer.content_hash {
                return Err(ChunkError::hash_mismatch(
                    header.chunk_number,
                    "Content hash does not match the footer",
                ));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            reserved_size,
            file: Mutex::new(Some(file)),
            write_position: AtomicU64::new(footer.data_size),
            flushed_position: AtomicU64::new(footer.data_size),
            footer: RwLock::new(Some(footer)),
            cache: RwLock::new(None),
        })
    }

    /// Reopens a not-yet-completed chunk for further appends.
    ///
    /// `write_position` comes from the writer checkpoint and is
    /// authoritative: bytes beyond it are unreachable and will be
    /// overwritten by subsequent appends.
    pub fn from_ongoing_file(path: &Path, write_position: u64) -> ChunkResult<Chunk> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                ChunkError::io_failed(format!("Failed to open chunk file: {}", path.display()), e)
            })?;

        let header = Self::read_header(&mut file, path)?;

        if write_position > header.data_capacity() {
            return Err(ChunkError::record_corrupt(format!(
                "Checkpointed write position {} exceeds chunk capacity {}",
                write_position,
                header.data_capacity()
            )));
        }

        let reserved_size = CHUNK_HEADER_SIZE + header.data_capacity() + CHUNK_FOOTER_SIZE;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            reserved_size,
            file: Mutex::new(Some(file)),
            write_position: AtomicU64::new(write_position),
            flushed_position: AtomicU64::new(write_position),
            footer: RwLock::new(None),
            cache: RwLock::new(None),
        })
    }

    /// Reads just the header of a chunk file on disk.
    pub fn peek_header(path: &Path) -> ChunkResult<ChunkHeader> {
        let mut file = OpenOptions::new().read(true).open(path).map_err(|e| {
            ChunkError::io_failed(format!("Failed to open chunk file: {}", path.display()), e)
        })?;
        Self::read_header(&mut file, path)
    }

    /// Whether the chunk file on disk carries a completion footer.
    pub fn file_is_completed(path: &Path) -> ChunkResult<bool> {
        let mut file = OpenOptions::new().read(true).open(path).map_err(|e| {
            ChunkError::io_failed(format!("Failed to open chunk file: {}", path.display()), e)
        })?;
        let reserved_size = file
            .metadata()
            .map_err(|e| ChunkError::io_failed("Failed to read chunk metadata", e))?
            .len();
        if reserved_size < CHUNK_HEADER_SIZE + CHUNK_FOOTER_SIZE {
            return Err(ChunkError::record_corrupt(format!(
                "Chunk file {} is smaller than header plus footer",
                path.display()
            )));
        }
        Ok(Self::read_footer(&mut file, reserved_size)?.is_some())
    }

    fn read_header(file: &mut File, path: &Path) -> ChunkResult<ChunkHeader> {
        let mut block = vec![0u8; CHUNK_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_exact(&mut block))
            .map_err(|e| {
                ChunkError::io_failed(
                    format!("Failed to read chunk header: {}", path.display()),
                    e,
                )
            })?;
        ChunkHeader::deserialize(&block).map_err(|e| ChunkError::record_corrupt(e.to_string()))
    }

    fn read_footer(file: &mut File, reserved_size: u64) -> ChunkResult<Option<ChunkFooter>> {
        let mut block = vec![0u8; CHUNK_FOOTER_SIZE as usize];
        file.seek(SeekFrom::Start(reserved_size - CHUNK_FOOTER_SIZE))
            .and_then(|_| file.read_exact(&mut block))
            .map_err(|e| ChunkError::io_failed("Failed to read chunk footer", e))?;
        ChunkFooter::deserialize(&block).map_err(|e| ChunkError::record_corrupt(e.to_string()))
    }

    fn digest_data_region(file: &File, data_size: u64) -> ChunkResult<[u8; CONTENT_HASH_LEN]> {
        let mut reader = file;
        reader
            .seek(SeekFrom::Start(CHUNK_HEADER_SIZE))
            .map_err(|e| ChunkError::io_failed("Failed to seek to data region", e))?;

        let mut hasher = Sha256::new();
        let mut remaining = data_size;
        let mut buffer = [0u8; 8192];
        while remaining > 0 {
            let want = remaining.min(buffer.len() as u64) as usize;
            reader
                .read_exact(&mut buffer[..want])
                .map_err(|e| ChunkError::io_failed("Failed to read data region", e))?;
            hasher.update(&buffer[..want]);
            remaining -= want as u64;
        }

        Ok(hasher.finalize().into())
    }

    // Accessors

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chunk_number(&self) -> u32 {
        self.header.chunk_number
    }

    pub fn chunk_start_position(&self) -> u64 {
        self.header.chunk_start_position
    }

    pub fn chunk_end_position(&self) -> u64 {
        self.header.chunk_end_position
    }

    pub fn data_capacity(&self) -> u64 {
        self.header.data_capacity()
    }

    /// Local offset of the next append.
    pub fn writer_position(&self) -> u64 {
        self.write_position.load(Ordering::Acquire)
    }

    /// Bytes of the data region a reader may address right now.
    pub fn data_size(&self) -> u64 {
        match self.read_guard(&self.footer).as_ref() {
            Some(footer) => footer.data_size,
            None => self.writer_position(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_guard(&self.footer).is_some()
    }

    pub fn is_cached(&self) -> bool {
        self.read_guard(&self.cache).is_some()
    }

    // Write path

    /// Appends one serialized record.
    ///
    /// Returns `success == false` when the frame exceeds the remaining
    /// capacity; the writer position is unchanged and the caller rolls to
    /// the next chunk. Fails with `TIDE_CHUNK_SEALED` once completed.
    pub fn try_append(&self, record: &LogRecord) -> ChunkResult<RecordWriteResult> {
        if self.is_read_only() {
            return Err(ChunkError::sealed(self.header.chunk_number));
        }

        let frame = record.serialize();
        let position = self.write_position.load(Ordering::Acquire);

        if position + frame.len() as u64 > self.data_capacity() {
            return Ok(RecordWriteResult::failed(position));
        }

        {
            let guard = self.lock_file();
            let file = self.file_or_disposed(&guard)?;
            (&*file)
                .seek(SeekFrom::Start(CHUNK_HEADER_SIZE + position))
                .and_then(|_| (&*file).write_all(&frame))
                .map_err(|e| {
                    ChunkError::io_failed(
                        format!(
                            "Failed to append record at local offset {} in chunk {}",
                            position, self.header.chunk_number
                        ),
                        e,
                    )
                })?;
        }

        // Publish only after the bytes are placed.
        let new_position = position + frame.len() as u64;
        self.write_position.store(new_position, Ordering::Release);

        Ok(RecordWriteResult::successful(position, new_position))
    }

    /// Forces durable write of appended bytes not yet synced. Idempotent;
    /// a no-op when nothing is pending.
    pub fn flush(&self) -> ChunkResult<()> {
        let written = self.write_position.load(Ordering::Acquire);
        if self.flushed_position.load(Ordering::Acquire) >= written {
            return Ok(());
        }

        {
            let guard = self.lock_file();
            let file = self.file_or_disposed(&guard)?;
            file.sync_data().map_err(|e| {
                ChunkError::io_failed(
                    format!("fsync failed on chunk {}", self.header.chunk_number),
                    e,
                )
            })?;
        }

        self.flushed_position.store(written, Ordering::Release);
        Ok(())
    }

    /// Seals the chunk: writes the footer with the logical data size and
    /// the SHA-256 digest over exactly that many bytes, then syncs.
    ///
    /// Valid only on a writable chunk with no in-flight appends (the
    /// chunked log drains the writer first). Afterwards `try_append`
    /// always fails with `TIDE_CHUNK_SEALED`.
    pub fn complete(&self) -> ChunkResult<()> {
        if self.is_read_only() {
            return Err(ChunkError::sealed(self.header.chunk_number));
        }

        let data_size = self.write_position.load(Ordering::Acquire);
        let footer = {
            let guard = self.lock_file();
            let file = self.file_or_disposed(&guard)?;

            let hash = Self::digest_data_region(file, data_size)?;
            let footer = ChunkFooter::new(data_size, hash);
            (&*file)
                .seek(SeekFrom::Start(self.reserved_size - CHUNK_FOOTER_SIZE))
                .and_then(|_| (&*file).write_all(&footer.serialize()))
                .map_err(|e| {
                    ChunkError::io_failed(
                        format!("Failed to write chunk {} footer", self.header.chunk_number),
                        e,
                    )
                })?;

            file.sync_all().map_err(|e| {
                ChunkError::io_failed(
                    format!("fsync failed completing chunk {}", self.header.chunk_number),
                    e,
                )
            })?;

            footer
        };

        self.flushed_position.store(data_size, Ordering::Release);
        *self.write_guard(&self.footer) = Some(footer);
        Ok(())
    }

    // Read path

    /// Decodes the record starting at `local_position`.
    ///
    /// Fails (success = false) beyond the writer position on a writable
    /// chunk or the footer-declared data size on a completed one. Corrupt
    /// frames surface as `TIDE_RECORD_CORRUPT`.
    pub fn try_read_at(&self, local_position: u64) -> ChunkResult<ReadResult> {
        let limit = self.data_size();
        if local_position + (FRAME_SIZE_LEN as u64) > limit {
            return Ok(ReadResult::out_of_range(local_position));
        }

        let mut size_buf = [0u8; FRAME_SIZE_LEN];
        self.read_data(local_position, &mut size_buf)?;
        let size = u32::from_le_bytes(size_buf);

        if size == 0 || size > MAX_RECORD_SIZE {
            return Err(ChunkError::corrupt_at_offset(
                local_position,
                format!("Invalid record size: {}", size),
            ));
        }

        let frame_len = (FRAME_SIZE_LEN as u64) * 2 + size as u64;
        if local_position + frame_len > limit {
            return Err(ChunkError::corrupt_at_offset(
                local_position,
                format!(
                    "Record frame of {} bytes runs past the data region end {}",
                    frame_len, limit
                ),
            ));
        }

        let mut frame = vec![0u8; frame_len as usize];
        self.read_data(local_position, &mut frame)?;

        let (record, _) = LogRecord::deserialize(&frame)
            .map_err(|e| ChunkError::corrupt_at_offset(local_position, e.to_string()))?;

        let expected = self.header.chunk_start_position + local_position;
        if record.log_position() != expected {
            return Err(ChunkError::corrupt_at_offset(
                local_position,
                format!(
                    "Record claims log position {}, expected {}",
                    record.log_position(),
                    expected
                ),
            ));
        }

        Ok(ReadResult::found(record, local_position + frame_len))
    }

    /// Decodes the record that ends exactly at `local_end`, using the
    /// frame's trailing size field. This is the backward-scan primitive.
    ///
    /// `next_position` in the result is the record's start offset.
    pub fn try_read_before(&self, local_end: u64) -> ChunkResult<ReadResult> {
        let limit = self.data_size();
        let min_frame = (FRAME_SIZE_LEN as u64) * 2 + 1;
        if local_end > limit || local_end < min_frame {
            return Ok(ReadResult::out_of_range(local_end));
        }

        let mut size_buf = [0u8; FRAME_SIZE_LEN];
        self.read_data(local_end - FRAME_SIZE_LEN as u64, &mut size_buf)?;
        let size = u32::from_le_bytes(size_buf);

        if size == 0 || size > MAX_RECORD_SIZE {
            return Err(ChunkError::corrupt_at_offset(
                local_end,
                format!("Invalid record size suffix: {}", size),
            ));
        }

        let frame_len = (FRAME_SIZE_LEN as u64) * 2 + size as u64;
        if frame_len > local_end {
            return Err(ChunkError::corrupt_at_offset(
                local_end,
                format!(
                    "Record size suffix {} runs past the data region start",
                    size
                ),
            ));
        }

        let start = local_end - frame_len;
        let result = self.try_read_at(start)?;
        match result.record {
            Some(record) => Ok(ReadResult::found(record, start)),
            None => Ok(ReadResult::out_of_range(local_end)),
        }
    }

    // Cache

    /// Mirrors the currently readable data bytes into memory. Idempotent.
    ///
    /// Reads return bit-identical results cached or not; appends that land
    /// after the mirrored prefix are served from disk until the chunk is
    /// re-cached.
    pub fn cache_in_memory(&self) -> ChunkResult<()> {
        if self.is_cached() {
            return Ok(());
        }

        let snapshot_len = self.data_size();
        let mut bytes = vec![0u8; snapshot_len as usize];
        if snapshot_len > 0 {
            self.read_from_file(0, &mut bytes)?;
        }

        *self.write_guard(&self.cache) = Some(Arc::new(bytes));
        Ok(())
    }

    /// Drops the in-memory mirror. Idempotent.
    pub fn un_cache_from_memory(&self) {
        *self.write_guard(&self.cache) = None;
    }

    // Teardown

    /// Releases the file handle and any cached memory. Safe to call
    /// repeatedly; subsequent file operations fail with `TIDE_CHUNK_IO`.
    pub fn dispose(&self) {
        *self.lock_file() = None;
        *self.write_guard(&self.cache) = None;
    }

    // Internals

    fn read_data(&self, offset: u64, buf: &mut [u8]) -> ChunkResult<()> {
        let cached = self.read_guard(&self.cache).clone();
        if let Some(cache) = cached {
            let end = offset + buf.len() as u64;
            if end <= cache.len() as u64 {
                buf.copy_from_slice(&cache[offset as usize..end as usize]);
                return Ok(());
            }
        }
        self.read_from_file(offset, buf)
    }

    fn read_from_file(&self, offset: u64, buf: &mut [u8]) -> ChunkResult<()> {
        let guard = self.lock_file();
        let file = self.file_or_disposed(&guard)?;
        (&*file)
            .seek(SeekFrom::Start(CHUNK_HEADER_SIZE + offset))
            .and_then(|_| (&*file).read_exact(buf))
            .map_err(|e| {
                ChunkError::io_failed(
                    format!(
                        "Failed to read {} bytes at local offset {} in chunk {}",
                        buf.len(),
                        offset,
                        self.header.chunk_number
                    ),
                    e,
                )
            })
    }

    fn lock_file(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file_or_disposed<'a>(
        &self,
        guard: &'a MutexGuard<'_, Option<File>>,
    ) -> ChunkResult<&'a File> {
        guard.as_ref().ok_or_else(|| {
            ChunkError::io_failed(
                format!("Chunk {} is disposed", self.header.chunk_number),
                std::io::Error::new(std::io::ErrorKind::Other, "file handle released"),
            )
        })
    }

    fn read_guard<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockReadGuard<'a, T> {
        lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockWriteGuard<'a, T> {
        lock.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PrepareFlags, PrepareRecord};
    use chrono::TimeZone;
    use tempfile::TempDir;
    use uuid::Uuid;

    const CAPACITY: u64 = 4096;

    fn fixed_time() -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(946_728_000_000).single().unwrap()
    }

    fn prepare_at(position: u64, stream: &str) -> LogRecord {
        LogRecord::Prepare(PrepareRecord::new(
            position,
            Uuid::new_v4(),
            Uuid::new_v4(),
            position,
            0,
            stream,
            -2,
            fixed_time(),
            PrepareFlags::single_write(),
            "tested",
            vec![1, 2, 3, 4, 5],
            Vec::new(),
        ))
    }

    #[test]
    fn test_append_returns_occupied_range() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("chunk-000000.tlog"), CAPACITY, 0).unwrap();

        let record = prepare_at(0, "s");
        let result = chunk.try_append(&record).unwrap();

        assert!(result.success);
        assert_eq!(result.old_position, 0);
        assert_eq!(result.new_position, record.frame_size() as u64);
        assert_eq!(chunk.writer_position(), result.new_position);
    }

    #[test]
    fn test_record_readable_without_flush() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        let record = prepare_at(0, "s");
        chunk.try_append(&record).unwrap();

        let read = chunk.try_read_at(0).unwrap();
        assert!(read.success);
        assert_eq!(read.record.unwrap(), record);
    }

    #[test]
    fn test_read_beyond_writer_position_fails_without_error() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        let record = prepare_at(0, "s");
        chunk.try_append(&record).unwrap();

        let read = chunk.try_read_at(record.frame_size() as u64).unwrap();
        assert!(!read.success);
        assert!(read.record.is_none());
    }

    #[test]
    fn test_append_fails_when_record_does_not_fit() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), 64, 0).unwrap();

        let record = prepare_at(0, "stream-name-too-long-for-a-64-byte-chunk");
        let result = chunk.try_append(&record).unwrap();

        assert!(!result.success);
        assert_eq!(result.old_position, 0);
        assert_eq!(result.new_position, 0);
        assert_eq!(chunk.writer_position(), 0);
    }

    #[test]
    fn test_complete_seals_the_chunk() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        chunk.try_append(&prepare_at(0, "s")).unwrap();
        chunk.flush().unwrap();
        chunk.complete().unwrap();

        assert!(chunk.is_read_only());
        let err = chunk.try_append(&prepare_at(chunk.writer_position(), "s")).unwrap_err();
        assert!(err.is_sealed());
    }

    #[test]
    fn test_complete_twice_is_an_error() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();
        chunk.complete().unwrap();
        assert!(chunk.complete().unwrap_err().is_sealed());
    }

    #[test]
    fn test_completed_chunk_reopens_and_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");
        let record = prepare_at(0, "s");

        {
            let chunk = Chunk::create_new(&path, CAPACITY, 0).unwrap();
            chunk.try_append(&record).unwrap();
            chunk.flush().unwrap();
            chunk.complete().unwrap();
        }

        let reopened = Chunk::from_completed_file(&path, true).unwrap();
        assert!(reopened.is_read_only());
        assert_eq!(reopened.data_size(), record.frame_size() as u64);

        let read = reopened.try_read_at(0).unwrap();
        assert_eq!(read.record.unwrap(), record);
    }

    #[test]
    fn test_flipped_byte_fails_hash_verification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");

        {
            let chunk = Chunk::create_new(&path, CAPACITY, 0).unwrap();
            chunk.try_append(&prepare_at(0, "s")).unwrap();
            chunk.complete().unwrap();
        }

        // Flip one byte inside the footer-declared data size.
        {
            let mut file = OpenOptions::new().write(true).read(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(CHUNK_HEADER_SIZE + 10)).unwrap();
            let mut byte = [0u8; 1];
            (&file).read_exact(&mut byte).unwrap();
            file.seek(SeekFrom::Start(CHUNK_HEADER_SIZE + 10)).unwrap();
            file.write_all(&[byte[0] ^ 0xFF]).unwrap();
        }

        let err = Chunk::from_completed_file(&path, true).unwrap_err();
        assert_eq!(err.code().code(), "TIDE_HASH_MISMATCH");

        // Without verification the file still opens.
        assert!(Chunk::from_completed_file(&path, false).is_ok());
    }

    #[test]
    fn test_reopening_incomplete_chunk_as_completed_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");
        {
            let chunk = Chunk::create_new(&path, CAPACITY, 0).unwrap();
            chunk.try_append(&prepare_at(0, "s")).unwrap();
            chunk.flush().unwrap();
        }
        assert!(Chunk::from_completed_file(&path, false).is_err());
    }

    #[test]
    fn test_ongoing_chunk_resumes_at_checkpointed_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");
        let first = prepare_at(0, "s");
        let end = first.frame_size() as u64;

        {
            let chunk = Chunk::create_new(&path, CAPACITY, 0).unwrap();
            chunk.try_append(&first).unwrap();
            chunk.flush().unwrap();
        }

        let chunk = Chunk::from_ongoing_file(&path, end).unwrap();
        assert_eq!(chunk.writer_position(), end);
        assert!(!chunk.is_read_only());

        let second = prepare_at(end, "s");
        let result = chunk.try_append(&second).unwrap();
        assert!(result.success);
        assert_eq!(result.old_position, end);

        assert_eq!(chunk.try_read_at(0).unwrap().record.unwrap(), first);
        assert_eq!(chunk.try_read_at(end).unwrap().record.unwrap(), second);
    }

    #[test]
    fn test_cache_is_read_transparent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.tlog");
        let record = prepare_at(0, "s");

        {
            let chunk = Chunk::create_new(&path, CAPACITY, 0).unwrap();
            chunk.try_append(&record).unwrap();
            chunk.complete().unwrap();
        }

        let chunk = Chunk::from_completed_file(&path, true).unwrap();

        let uncached = chunk.try_read_at(0).unwrap();
        chunk.cache_in_memory().unwrap();
        assert!(chunk.is_cached());
        let cached = chunk.try_read_at(0).unwrap();
        assert_eq!(uncached, cached);

        chunk.un_cache_from_memory();
        assert!(!chunk.is_cached());
        assert_eq!(chunk.try_read_at(0).unwrap(), uncached);
    }

    #[test]
    fn test_cache_toggles_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        chunk.cache_in_memory().unwrap();
        chunk.cache_in_memory().unwrap();
        assert!(chunk.is_cached());

        chunk.un_cache_from_memory();
        chunk.un_cache_from_memory();
        assert!(!chunk.is_cached());
    }

    #[test]
    fn test_append_after_cache_still_readable() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        let first = prepare_at(0, "s");
        chunk.try_append(&first).unwrap();
        chunk.cache_in_memory().unwrap();

        // Lands beyond the mirrored prefix; served from disk.
        let second = prepare_at(first.frame_size() as u64, "s");
        chunk.try_append(&second).unwrap();

        assert_eq!(chunk.try_read_at(0).unwrap().record.unwrap(), first);
        assert_eq!(
            chunk
                .try_read_at(first.frame_size() as u64)
                .unwrap()
                .record
                .unwrap(),
            second
        );
    }

    #[test]
    fn test_read_before_walks_backward() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();

        let first = prepare_at(0, "s");
        chunk.try_append(&first).unwrap();
        let second = prepare_at(first.frame_size() as u64, "s");
        chunk.try_append(&second).unwrap();

        let end = chunk.writer_position();
        let last = chunk.try_read_before(end).unwrap();
        assert_eq!(last.record.unwrap(), second);
        assert_eq!(last.next_position, first.frame_size() as u64);

        let prior = chunk.try_read_before(last.next_position).unwrap();
        assert_eq!(prior.record.unwrap(), first);
        assert_eq!(prior.next_position, 0);

        let nothing = chunk.try_read_before(0).unwrap();
        assert!(!nothing.success);
    }

    #[test]
    fn test_dispose_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let chunk = Chunk::create_new(&dir.path().join("c.tlog"), CAPACITY, 0).unwrap();
        chunk.dispose();
        chunk.dispose();
        assert!(chunk.try_read_at(0).is_err() || !chunk.try_read_at(0).unwrap().success);
    }
}
