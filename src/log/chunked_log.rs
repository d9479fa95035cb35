//! The chunk sequence: the multi-chunk log as one append-only space
//!
//! An ordered arena of chunks covering the whole log. Chunks reference
//! each other only by numeric adjacency; position lookups binary-search
//! the chunk boundary table. Exactly one chunk (the last) is writable;
//! all appends funnel through one writer lock, which is what makes the
//! single-writer invariant structural rather than conventional.
//!
//! Global position = chunk start position + local offset. Completing a
//! partially filled chunk leaves its tail positions unoccupied; the next
//! record lands at the next chunk's start. Record positions therefore
//! stay strictly increasing without renumbering.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::chunk::{Chunk, ChunkError, ChunkResult, ReadResult, RecordWriteResult};
use crate::config::StoreConfig;
use crate::observability::{Logger, Severity as LogSeverity};
use crate::record::LogRecord;

use super::checkpoint::{Checkpoint, CHECKPOINT_FILE};

/// File-name extension for chunk files.
pub const CHUNK_FILE_EXTENSION: &str = "tlog";

#[derive(Debug)]
struct WriterState {
    checkpoint: Checkpoint,
    /// Next global position an append will occupy
    position: u64,
}

/// The whole transaction log: an ordered chunk arena plus one writer.
#[derive(Debug)]
pub struct ChunkedLog {
    dir: PathBuf,
    config: StoreConfig,
    chunks: RwLock<Vec<Arc<Chunk>>>,
    writer: Mutex<WriterState>,
}

impl ChunkedLog {
    /// Opens or creates the log in `dir`.
    ///
    /// A fresh directory gets chunk 0 and a zeroed writer checkpoint. An
    /// existing directory is recovered: every chunk but the last reopens
    /// as completed (hash-verified per config), the last reopens for
    /// appending at the checkpointed writer position. Chunk adjacency is
    /// validated.
    pub fn open(dir: &Path, mut config: StoreConfig) -> ChunkResult<ChunkedLog> {
        fs::create_dir_all(dir).map_err(|e| {
            ChunkError::io_failed(
                format!("Failed to create log directory: {}", dir.display()),
                e,
            )
        })?;

        let mut chunk_files = Self::scan_chunk_files(dir)?;

        if chunk_files.is_empty() {
            let checkpoint = Checkpoint::create(dir)?;
            let first = Arc::new(Chunk::create_new(
                &Self::chunk_path(dir, 0),
                config.chunk_data_size,
                0,
            )?);
            Logger::log(
                LogSeverity::Info,
                "log_created",
                &[("dir", &dir.display().to_string())],
            );
            return Ok(Self {
                dir: dir.to_path_buf(),
                config,
                chunks: RwLock::new(vec![first]),
                writer: Mutex::new(WriterState {
                    checkpoint,
                    position: 0,
                }),
            });
        }

        if !dir.join(CHECKPOINT_FILE).exists() {
            return Err(ChunkError::checkpoint_corrupt(format!(
                "Log directory {} has chunks but no writer checkpoint",
                dir.display()
            )));
        }
        let checkpoint = Checkpoint::open(dir)?;

        chunk_files.sort();

        // Position arithmetic is fixed by the chunks already on disk; the
        // headers win over a disagreeing config value.
        let on_disk_capacity = Chunk::peek_header(&chunk_files[0])?.data_capacity();
        if on_disk_capacity != config.chunk_data_size {
            Logger::log(
                LogSeverity::Warn,
                "chunk_size_overridden_by_headers",
                &[
                    ("configured", &config.chunk_data_size.to_string()),
                    ("on_disk", &on_disk_capacity.to_string()),
                ],
            );
            config.chunk_data_size = on_disk_capacity;
        }

        let mut chunks: Vec<Arc<Chunk>> = Vec::with_capacity(chunk_files.len() + 1);
        let last_index = chunk_files.len() - 1;

        for (i, path) in chunk_files.iter().enumerate() {
            let chunk = if i < last_index || Chunk::file_is_completed(path)? {
                let chunk = Chunk::from_completed_file(path, config.verify_hashes_on_open)?;
                if config.cache_completed_chunks {
                    chunk.cache_in_memory()?;
                }
                chunk
            } else {
                let header_start = Self::peek_start_position(path)?;
                let local = checkpoint.read().saturating_sub(header_start);
                Chunk::from_ongoing_file(path, local)?
            };
            chunks.push(Arc::new(chunk));
        }

        // If even the last chunk on disk is completed (crash between
        // completion and the next creation), start the successor now.
        if chunks[last_index].is_read_only() {
            let next_number = chunks[last_index].chunk_number() + 1;
            let next = Chunk::create_new(
                &Self::chunk_path(dir, next_number),
                config.chunk_data_size,
                next_number,
            )?;
            chunks.push(Arc::new(next));
        }

        Self::validate_adjacency(&chunks)?;

        let active = chunks
            .last()
            .cloned()
            .expect("chunk list cannot be empty here");
        let position = active.chunk_start_position() + active.writer_position();

        Logger::log(
            LogSeverity::Info,
            "log_recovered",
            &[
                ("chunks", &chunks.len().to_string()),
                ("writer_position", &position.to_string()),
            ],
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            chunks: RwLock::new(chunks),
            writer: Mutex::new(WriterState {
                checkpoint,
                position,
            }),
        })
    }

    fn scan_chunk_files(dir: &Path) -> ChunkResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            ChunkError::io_failed(
                format!("Failed to list log directory: {}", dir.display()),
                e,
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| ChunkError::io_failed("Failed to read directory entry", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(CHUNK_FILE_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn chunk_path(dir: &Path, chunk_number: u32) -> PathBuf {
        dir.join(format!("chunk-{:06}.{}", chunk_number, CHUNK_FILE_EXTENSION))
    }

    fn peek_start_position(path: &Path) -> ChunkResult<u64> {
        Ok(Chunk::peek_header(path)?.chunk_start_position)
    }

    fn validate_adjacency(chunks: &[Arc<Chunk>]) -> ChunkResult<()> {
        for pair in chunks.windows(2) {
            if pair[0].chunk_end_position() + 1 != pair[1].chunk_start_position() {
                return Err(ChunkError::record_corrupt(format!(
                    "Chunk {} ends at {} but chunk {} starts at {}",
                    pair[0].chunk_number(),
                    pair[0].chunk_end_position(),
                    pair[1].chunk_number(),
                    pair[1].chunk_start_position()
                )));
            }
        }
        Ok(())
    }

    /// Appends one record at the current global writer position.
    ///
    /// The record's log position is stamped just before the bytes are
    /// placed. If the active chunk lacks capacity it is completed, the
    /// next chunk is created, and the append is retried exactly once; a
    /// record never spans chunks. A record larger than an entire empty
    /// chunk is `TIDE_CHUNK_FULL`.
    pub fn append(&self, mut record: LogRecord) -> ChunkResult<RecordWriteResult> {
        let mut writer = self.lock_writer();

        let active = self.active_chunk();
        record.set_log_position(writer.position);

        let result = active.try_append(&record)?;
        if result.success {
            writer.position = active.chunk_start_position() + result.new_position;
            return Ok(RecordWriteResult::successful(
                active.chunk_start_position() + result.old_position,
                writer.position,
            ));
        }

        let next = self.roll_to_next_chunk(&active)?;
        writer.position = next.chunk_start_position();
        // The completed chunk's records are durable now; the checkpoint
        // must cover them before new appends land in the successor.
        let position = writer.position;
        writer.checkpoint.write(position)?;
        record.set_log_position(position);

        let retried = next.try_append(&record)?;
        if !retried.success {
            return Err(ChunkError::chunk_full(
                record.frame_size() as u64,
                next.data_capacity(),
            ));
        }

        writer.position = next.chunk_start_position() + retried.new_position;
        Ok(RecordWriteResult::successful(
            next.chunk_start_position() + retried.old_position,
            writer.position,
        ))
    }

    fn roll_to_next_chunk(&self, active: &Arc<Chunk>) -> ChunkResult<Arc<Chunk>> {
        active.flush()?;
        active.complete()?;
        if self.config.cache_completed_chunks {
            active.cache_in_memory()?;
        }

        Logger::log(
            LogSeverity::Info,
            "chunk_completed",
            &[
                ("chunk_number", &active.chunk_number().to_string()),
                ("data_size", &active.data_size().to_string()),
            ],
        );

        let next_number = active.chunk_number() + 1;
        let next = Arc::new(Chunk::create_new(
            &Self::chunk_path(&self.dir, next_number),
            self.config.chunk_data_size,
            next_number,
        )?);

        self.write_chunks().push(next.clone());
        Ok(next)
    }

    /// Resolves the owning chunk for `global_position` and reads there.
    ///
    /// `next_position` of a successful read is global: the position of
    /// the following record.
    pub fn read_at(&self, global_position: u64) -> ChunkResult<ReadResult> {
        let chunk = match self.chunk_for_position(global_position) {
            Some(chunk) => chunk,
            None => return Ok(ReadResult::out_of_range(global_position)),
        };

        let local = global_position - chunk.chunk_start_position();
        let result = chunk.try_read_at(local)?;
        Ok(Self::globalize(result, chunk.chunk_start_position()))
    }

    /// Reads the record that ends exactly at `global_end`, stepping over
    /// the unoccupied tail of completed chunks.
    pub(crate) fn read_ending_at(&self, global_end: u64) -> ChunkResult<ReadResult> {
        if global_end == 0 {
            return Ok(ReadResult::out_of_range(0));
        }

        // The byte just before `global_end` locates the owning chunk.
        let chunk = match self.chunk_for_position(global_end - 1) {
            Some(chunk) => chunk,
            None => return Ok(ReadResult::out_of_range(global_end)),
        };

        let local_end = global_end - chunk.chunk_start_position();
        let result = chunk.try_read_before(local_end)?;
        Ok(Self::globalize(result, chunk.chunk_start_position()))
    }

    fn globalize(result: ReadResult, chunk_start: u64) -> ReadResult {
        if result.success {
            ReadResult {
                next_position: chunk_start + result.next_position,
                ..result
            }
        } else {
            result
        }
    }

    /// The chunk owning `global_position`, by binary search over the
    /// boundary table. None when the position is past the last chunk.
    pub fn chunk_for_position(&self, global_position: u64) -> Option<Arc<Chunk>> {
        let chunks = self.read_chunks();
        let index = chunks
            .partition_point(|c| c.chunk_start_position() <= global_position)
            .checked_sub(1)?;
        let chunk = &chunks[index];
        if global_position > chunk.chunk_end_position() {
            return None;
        }
        Some(chunk.clone())
    }

    /// Flushes the active chunk and persists the writer checkpoint.
    pub fn flush(&self) -> ChunkResult<()> {
        let mut writer = self.lock_writer();
        self.active_chunk().flush()?;
        let position = writer.position;
        writer.checkpoint.write(position)
    }

    /// Next global position an append will occupy.
    pub fn writer_position(&self) -> u64 {
        self.lock_writer().position
    }

    /// Global position of the end of readable data in the last chunk.
    /// Equal to `writer_position` while the last chunk is writable.
    pub fn end_position(&self) -> u64 {
        let chunks = self.read_chunks();
        match chunks.last() {
            Some(last) => last.chunk_start_position() + last.data_size(),
            None => 0,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.read_chunks().len()
    }

    /// Snapshot of the chunk arena, oldest first.
    pub fn chunks(&self) -> Vec<Arc<Chunk>> {
        self.read_chunks().clone()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Flushes, checkpoints, and releases every chunk's resources.
    pub fn close(&self) -> ChunkResult<()> {
        self.flush()?;
        for chunk in self.read_chunks().iter() {
            chunk.dispose();
        }
        Ok(())
    }

    fn active_chunk(&self) -> Arc<Chunk> {
        self.read_chunks()
            .last()
            .cloned()
            .expect("the chunk arena always holds at least one chunk")
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_chunks(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Chunk>>> {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_chunks(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Chunk>>> {
        self.chunks.write().unwrap_or_else(PoisonError::into_inner)
    }
}
