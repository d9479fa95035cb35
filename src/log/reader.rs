//! Whole-log sequential readers
//!
//! Iterate records in global position order across chunk boundaries,
//! restartable from any previously observed position. Forward scans step
//! over the unoccupied tail of completed chunks; backward scans use the
//! record frames' trailing size fields and stop at position 0.
//!
//! Iteration stops on the first error; the error is held on the reader
//! and must be checked after the walk, as the storage layer treats any
//! mid-log corruption as fatal.

use crate::chunk::{ChunkError, ChunkResult};
use crate::record::LogRecord;

use super::chunked_log::ChunkedLog;

/// A record paired with the global position it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAt {
    pub position: u64,
    pub record: LogRecord,
}

/// Ascending-position reader over the whole log.
pub struct ForwardLogReader<'a> {
    log: &'a ChunkedLog,
    position: u64,
    error: Option<ChunkError>,
}

impl<'a> ForwardLogReader<'a> {
    pub fn new(log: &'a ChunkedLog, from_position: u64) -> Self {
        Self {
            log,
            position: from_position,
            error: None,
        }
    }

    /// Position the next read will start from; a later reader can resume
    /// here.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the error that stopped iteration, if any.
    pub fn error(&self) -> Option<&ChunkError> {
        self.error.as_ref()
    }

    /// Consumes the reader and returns the error if any.
    pub fn into_error(self) -> Option<ChunkError> {
        self.error
    }
}

impl Iterator for ForwardLogReader<'_> {
    type Item = RecordAt;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        loop {
            match self.log.read_at(self.position) {
                Ok(result) if result.success => {
                    let position = self.position;
                    self.position = result.next_position;
                    let record = result
                        .record
                        .expect("successful read always carries a record");
                    return Some(RecordAt { position, record });
                }
                Ok(_) => {
                    // End of this chunk's data. If the chunk is sealed and
                    // a successor exists, continue at its start.
                    let chunk = self.log.chunk_for_position(self.position)?;
                    if !chunk.is_read_only() {
                        return None;
                    }
                    let next_start = chunk.chunk_end_position() + 1;
                    if self.log.chunk_for_position(next_start).is_none() {
                        return None;
                    }
                    self.position = next_start;
                }
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
    }
}

/// Descending-position reader over the whole log.
///
/// Constructed with the exclusive end position to walk back from; yields
/// the record ending there first, then its predecessors, stopping at
/// global position 0.
pub struct BackwardLogReader<'a> {
    log: &'a ChunkedLog,
    position: u64,
    error: Option<ChunkError>,
}

impl<'a> BackwardLogReader<'a> {
    pub fn new(log: &'a ChunkedLog, from_position: u64) -> Self {
        Self {
            log,
            position: from_position.min(log.end_position()),
            error: None,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn error(&self) -> Option<&ChunkError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<ChunkError> {
        self.error
    }
}

impl Iterator for BackwardLogReader<'_> {
    type Item = RecordAt;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        loop {
            if self.position == 0 {
                return None;
            }

            match self.log.read_ending_at(self.position) {
                Ok(result) if result.success => {
                    // next_position is the record's start offset.
                    self.position = result.next_position;
                    let record = result
                        .record
                        .expect("successful read always carries a record");
                    return Some(RecordAt {
                        position: self.position,
                        record,
                    });
                }
                Ok(_) => {
                    // No record ends here: the position sits in (or just
                    // past) a completed chunk's unoccupied tail. Clamp to
                    // that chunk's data end and retry.
                    let chunk = self.log.chunk_for_position(self.position - 1)?;
                    let data_end = chunk.chunk_start_position() + chunk.data_size();
                    if self.position > data_end {
                        self.position = data_end;
                    } else {
                        return None;
                    }
                }
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
    }
}

impl ChunkedLog {
    /// A finite ascending slice of the log: up to `max_count` records
    /// starting at `from_position`. Restart with the position after the
    /// last returned record to continue.
    pub fn read_all_forward(
        &self,
        from_position: u64,
        max_count: usize,
    ) -> ChunkResult<Vec<RecordAt>> {
        let mut reader = ForwardLogReader::new(self, from_position);
        let mut records = Vec::new();
        for entry in reader.by_ref() {
            records.push(entry);
            if records.len() >= max_count {
                break;
            }
        }
        match reader.into_error() {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }

    /// A finite descending slice of the log: up to `max_count` records
    /// walking back from `from_position` (exclusive), stopping at
    /// position 0.
    pub fn read_all_backward(
        &self,
        from_position: u64,
        max_count: usize,
    ) -> ChunkResult<Vec<RecordAt>> {
        let mut reader = BackwardLogReader::new(self, from_position);
        let mut records = Vec::new();
        for entry in reader.by_ref() {
            records.push(entry);
            if records.len() >= max_count {
                break;
            }
        }
        match reader.into_error() {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::record::{PrepareFlags, PrepareRecord};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn small_config() -> StoreConfig {
        StoreConfig {
            chunk_data_size: 1024,
            ..StoreConfig::default()
        }
    }

    fn prepare(n: u8) -> LogRecord {
        LogRecord::Prepare(PrepareRecord::new(
            0,
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            0,
            "scan",
            -2,
            Utc.timestamp_millis_opt(946_728_000_000).single().unwrap(),
            PrepareFlags::single_write(),
            "evt",
            vec![n; 48],
            Vec::new(),
        ))
    }

    fn write_records(log: &ChunkedLog, count: u8) -> Vec<u64> {
        (0..count)
            .map(|i| log.append(prepare(i)).unwrap().old_position)
            .collect()
    }

    #[test]
    fn test_forward_scan_returns_records_in_position_order() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        let positions = write_records(&log, 12);
        assert!(log.chunk_count() > 1, "scenario must cross a chunk boundary");

        let scanned = log.read_all_forward(0, usize::MAX).unwrap();
        assert_eq!(
            scanned.iter().map(|r| r.position).collect::<Vec<_>>(),
            positions
        );
    }

    #[test]
    fn test_forward_scan_restartable_mid_log() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        let positions = write_records(&log, 8);

        let first_half = log.read_all_forward(0, 3).unwrap();
        let resume_at = first_half
            .last()
            .map(|r| r.position + r.record.frame_size() as u64)
            .unwrap();
        let second_half = log.read_all_forward(resume_at, usize::MAX).unwrap();

        assert_eq!(first_half.len(), 3);
        assert_eq!(second_half.len(), 5);
        assert_eq!(second_half[0].position, positions[3]);
    }

    #[test]
    fn test_backward_scan_mirrors_forward_scan() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        write_records(&log, 12);

        let mut forward = log.read_all_forward(0, usize::MAX).unwrap();
        let backward = log
            .read_all_backward(log.writer_position(), usize::MAX)
            .unwrap();

        forward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_backward_scan_stops_at_zero() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        write_records(&log, 3);

        let records = log.read_all_backward(log.writer_position(), 100).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records.last().unwrap().position, 0);
    }

    #[test]
    fn test_backward_scan_on_empty_log_returns_nothing() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        let records = log.read_all_backward(log.writer_position(), 10).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_backward_scan_steps_over_completed_chunk_padding() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        // One big record forces a roll; the next lands in chunk 1.
        log.append(prepare(1)).unwrap();
        log.append(LogRecord::Prepare(PrepareRecord::new(
            0,
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            0,
            "scan",
            -2,
            Utc.timestamp_millis_opt(946_728_000_000).single().unwrap(),
            PrepareFlags::single_write(),
            "evt",
            vec![9; 800],
            Vec::new(),
        )))
        .unwrap();

        assert_eq!(log.chunk_count(), 2);
        let records = log
            .read_all_backward(log.writer_position(), usize::MAX)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].position, 0);
    }

    #[test]
    fn test_forward_cap_limits_slice() {
        let dir = TempDir::new().unwrap();
        let log = ChunkedLog::open(dir.path(), small_config()).unwrap();
        write_records(&log, 8);

        assert_eq!(log.read_all_forward(0, 5).unwrap().len(), 5);
        assert_eq!(log.read_all_backward(log.writer_position(), 5).unwrap().len(), 5);
    }
}
