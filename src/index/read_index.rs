//! The read index: stream-relative reads against the chunked log
//!
//! Keeps, per stream, the event-number → log-position table, the
//! hard-deletion tombstone bit, and a cache of the stream's retention
//! metadata. All of it is derived state: it is rebuilt by scanning the
//! log and kept current as the write path applies committed records.
//!
//! Prepares are held pending, keyed by transaction position, until their
//! commit arrives; only then do events become visible. Event numbers are
//! `commit.first_event_number + prepare.transaction_offset`.
//!
//! Retention never renumbers events: expired events become invisible,
//! their numbers stay used.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::chunk::{ChunkError, ChunkResult};
use crate::log::{BackwardLogReader, ChunkedLog, ForwardLogReader};
use crate::observability::{Logger, Severity as LogSeverity};
use crate::record::{CommitRecord, LogRecord, PrepareFlags, PrepareRecord};

use super::metadata::{StreamMetadata, METADATA_EVENT_TYPE, STREAM_CREATED_EVENT_TYPE};
use super::results::{
    AllEventsSlice, EventReadResult, EventRecord, RangeReadResult, ReadEventResult,
    ReadStreamResult,
};

#[derive(Debug, Clone, Copy)]
struct EventEntry {
    position: u64,
    timestamp_ms: i64,
}

#[derive(Debug, Default)]
struct StreamEntry {
    events: BTreeMap<i64, EventEntry>,
    is_deleted: bool,
}

#[derive(Default)]
struct IndexState {
    streams: HashMap<String, StreamEntry>,
    /// Committed prepare position → assigned event number
    committed: HashMap<u64, i64>,
    /// Prepares awaiting their commit, keyed by transaction position
    pending: HashMap<u64, Vec<(u64, PrepareRecord)>>,
    /// Retention metadata, refreshed when a metadata-bearing event commits
    metadata: HashMap<String, StreamMetadata>,
}

/// Resolves logical stream reads against the log, applying retention and
/// deletion policy.
pub struct ReadIndex {
    log: Arc<ChunkedLog>,
    state: RwLock<IndexState>,
}

impl ReadIndex {
    /// An empty index over `log`. Use `build` to populate from existing
    /// records.
    pub fn new(log: Arc<ChunkedLog>) -> Self {
        Self {
            log,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Builds the index by scanning every record in the log.
    pub fn build(log: Arc<ChunkedLog>) -> ChunkResult<ReadIndex> {
        let index = ReadIndex::new(log);
        {
            let mut reader = ForwardLogReader::new(&index.log, 0);
            for entry in reader.by_ref() {
                index.apply(entry.position, &entry.record);
            }
            if let Some(e) = reader.into_error() {
                return Err(e);
            }
        }

        Logger::log(
            LogSeverity::Info,
            "read_index_built",
            &[("streams", &index.read_state().streams.len().to_string())],
        );
        Ok(index)
    }

    /// Feeds one appended record into the index. The write path calls
    /// this for every record, in log order.
    pub fn apply(&self, position: u64, record: &LogRecord) {
        match record {
            LogRecord::Prepare(prepare) => self.process_prepare(position, prepare),
            LogRecord::Commit(commit) => self.process_commit(commit),
            LogRecord::System(_) => {}
        }
    }

    fn process_prepare(&self, position: u64, prepare: &PrepareRecord) {
        let mut state = self.write_state();
        state
            .pending
            .entry(prepare.transaction_position)
            .or_default()
            .push((position, prepare.clone()));
    }

    /// Makes the committed transaction's events visible.
    pub fn process_commit(&self, commit: &CommitRecord) {
        let mut state = self.write_state();
        let mut prepares = match state.pending.remove(&commit.transaction_position) {
            Some(prepares) => prepares,
            None => return,
        };
        prepares.sort_by_key(|(_, prepare)| prepare.transaction_offset);

        for (position, prepare) in prepares {
            let event_number = commit.first_event_number + prepare.transaction_offset as i64;
            {
                let entry = state
                    .streams
                    .entry(prepare.event_stream_id.clone())
                    .or_default();
                entry.events.insert(
                    event_number,
                    EventEntry {
                        position,
                        timestamp_ms: prepare.timestamp.timestamp_millis(),
                    },
                );
                if prepare.flags.contains(PrepareFlags::STREAM_DELETE) {
                    entry.is_deleted = true;
                }
            }
            state.committed.insert(position, event_number);
            Self::refresh_metadata(&mut state, &prepare);
        }
    }

    // The creation event carries metadata in its metadata field; a
    // `$metadata` event carries the replacement document in its data.
    fn refresh_metadata(state: &mut IndexState, prepare: &PrepareRecord) {
        let document = match prepare.event_type.as_str() {
            STREAM_CREATED_EVENT_TYPE => &prepare.metadata,
            METADATA_EVENT_TYPE => &prepare.data,
            _ => return,
        };
        match StreamMetadata::parse(document) {
            Some(metadata) => {
                state
                    .metadata
                    .insert(prepare.event_stream_id.clone(), metadata);
            }
            None => {
                if !document.is_empty() {
                    Logger::log_stderr(
                        LogSeverity::Warn,
                        "stream_metadata_unreadable",
                        &[("stream", &prepare.event_stream_id)],
                    );
                }
            }
        }
    }

    /// The stream's cached retention metadata; empty when none was set.
    pub fn stream_metadata(&self, stream_id: &str) -> StreamMetadata {
        self.read_state()
            .metadata
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Highest existing event number; None when the stream was never
    /// created.
    pub fn last_event_number(&self, stream_id: &str) -> Option<i64> {
        self.read_state()
            .streams
            .get(stream_id)
            .and_then(|entry| entry.events.keys().next_back().copied())
    }

    /// Whether the stream is tombstoned.
    pub fn is_stream_deleted(&self, stream_id: &str) -> bool {
        self.read_state()
            .streams
            .get(stream_id)
            .map(|entry| entry.is_deleted)
            .unwrap_or(false)
    }

    pub fn stream_count(&self) -> usize {
        self.read_state().streams.len()
    }

    /// Forward range read: events `[max(start, floor), start + count)`
    /// that exist and are inside the retention window, ascending.
    pub fn read_stream_events_forward(
        &self,
        stream_id: &str,
        start: i64,
        count: usize,
    ) -> ChunkResult<RangeReadResult> {
        let state = self.read_state();
        let (entry, metadata) = match Self::stream_view(&state, stream_id) {
            StreamView::Absent => return Ok(RangeReadResult::no_stream()),
            StreamView::Deleted => return Ok(RangeReadResult::stream_deleted()),
            StreamView::Live(entry, metadata) => (entry, metadata),
        };

        let (last, floor) = Self::visible_range(entry, &metadata, Utc::now());
        let start = start.max(0);

        if start > last {
            return Ok(RangeReadResult {
                result: ReadStreamResult::Success,
                records: Vec::new(),
                next_event_number: last + 1,
                last_event_number: last,
                is_end_of_stream: true,
            });
        }

        let span = i64::try_from(count).unwrap_or(i64::MAX);
        let lo = start.max(floor);
        let hi = match count {
            0 => start - 1,
            _ => start.saturating_add(span - 1).min(last),
        };

        if hi < lo {
            // The requested window lies entirely below the retained
            // range: skip the caller ahead to the first visible event.
            return Ok(RangeReadResult {
                result: ReadStreamResult::Success,
                records: Vec::new(),
                next_event_number: floor.min(last + 1),
                last_event_number: last,
                is_end_of_stream: false,
            });
        }

        let mut records = Vec::with_capacity((hi - lo + 1) as usize);
        for (&event_number, event) in entry.events.range(lo..=hi) {
            records.push(self.fetch_event(event_number, event)?);
        }

        let is_end_of_stream = hi >= last;
        Ok(RangeReadResult {
            result: ReadStreamResult::Success,
            records,
            next_event_number: if is_end_of_stream { last + 1 } else { hi + 1 },
            last_event_number: last,
            is_end_of_stream,
        })
    }

    /// Backward range read: events `(start - count, start]` that exist
    /// and are inside the retention window, descending.
    pub fn read_stream_events_backward(
        &self,
        stream_id: &str,
        start: i64,
        count: usize,
    ) -> ChunkResult<RangeReadResult> {
        let state = self.read_state();
        let (entry, metadata) = match Self::stream_view(&state, stream_id) {
            StreamView::Absent => return Ok(RangeReadResult::no_stream()),
            StreamView::Deleted => return Ok(RangeReadResult::stream_deleted()),
            StreamView::Live(entry, metadata) => (entry, metadata),
        };

        let (last, floor) = Self::visible_range(entry, &metadata, Utc::now());

        if start > last {
            // Out-of-bounds starting point: nothing read, but the stream
            // has more; the caller should retry from `last`.
            return Ok(RangeReadResult {
                result: ReadStreamResult::Success,
                records: Vec::new(),
                next_event_number: last,
                last_event_number: last,
                is_end_of_stream: false,
            });
        }

        let span = i64::try_from(count).unwrap_or(i64::MAX);
        let requested_lo = start.saturating_sub(span.saturating_sub(1));
        let lo = requested_lo.max(floor).max(0);
        let hi = start;

        let mut records = Vec::new();
        if lo <= hi {
            for (&event_number, event) in entry.events.range(lo..=hi).rev() {
                records.push(self.fetch_event(event_number, event)?);
            }
        }

        // The descending walk ends once it reaches the retention floor
        // or the stream start, even when this call returned nothing.
        let is_end_of_stream = requested_lo <= floor;
        Ok(RangeReadResult {
            result: ReadStreamResult::Success,
            records,
            next_event_number: if is_end_of_stream { -1 } else { lo - 1 },
            last_event_number: last,
            is_end_of_stream,
        })
    }

    /// Single-event read honoring retention and deletion.
    pub fn read_event(&self, stream_id: &str, event_number: i64) -> ChunkResult<EventReadResult> {
        let state = self.read_state();
        let (entry, metadata) = match Self::stream_view(&state, stream_id) {
            StreamView::Absent => return Ok(EventReadResult::absent(ReadEventResult::NoStream)),
            StreamView::Deleted => {
                return Ok(EventReadResult::absent(ReadEventResult::StreamDeleted))
            }
            StreamView::Live(entry, metadata) => (entry, metadata),
        };

        let (last, floor) = Self::visible_range(entry, &metadata, Utc::now());
        if event_number < floor || event_number > last {
            return Ok(EventReadResult::absent(ReadEventResult::NotFound));
        }

        match entry.events.get(&event_number) {
            Some(event) => Ok(EventReadResult::found(
                self.fetch_event(event_number, event)?,
            )),
            None => Ok(EventReadResult::absent(ReadEventResult::NotFound)),
        }
    }

    /// Ascending whole-log scan. Bypasses per-stream retention but skips
    /// uncommitted positions and events of hard-deleted streams.
    pub fn read_all_events_forward(
        &self,
        from_position: u64,
        max_count: usize,
    ) -> ChunkResult<AllEventsSlice> {
        let state = self.read_state();
        let mut reader = ForwardLogReader::new(&self.log, from_position);
        let mut records = Vec::new();
        let mut next_position = from_position;

        while let Some(entry) = reader.next() {
            next_position = reader.position();
            if let Some(event) = Self::resolve_committed(&state, entry.position, &entry.record) {
                records.push(event);
                if records.len() >= max_count {
                    break;
                }
            }
        }

        if let Some(e) = reader.into_error() {
            return Err(e);
        }
        Ok(AllEventsSlice {
            records,
            next_position,
        })
    }

    /// Descending whole-log scan from `from_position` (exclusive),
    /// stopping at position 0. Same visibility rules as the forward scan.
    pub fn read_all_events_backward(
        &self,
        from_position: u64,
        max_count: usize,
    ) -> ChunkResult<AllEventsSlice> {
        let state = self.read_state();
        let mut reader = BackwardLogReader::new(&self.log, from_position);
        let mut records = Vec::new();
        let mut next_position = reader.position();

        while let Some(entry) = reader.next() {
            next_position = reader.position();
            if let Some(event) = Self::resolve_committed(&state, entry.position, &entry.record) {
                records.push(event);
                if records.len() >= max_count {
                    break;
                }
            }
        }

        if let Some(e) = reader.into_error() {
            return Err(e);
        }
        Ok(AllEventsSlice {
            records,
            next_position,
        })
    }

    fn resolve_committed(
        state: &IndexState,
        position: u64,
        record: &LogRecord,
    ) -> Option<EventRecord> {
        let prepare = match record {
            LogRecord::Prepare(prepare) => prepare,
            _ => return None,
        };
        let &event_number = state.committed.get(&position)?;
        let deleted = state
            .streams
            .get(&prepare.event_stream_id)
            .map(|entry| entry.is_deleted)
            .unwrap_or(false);
        if deleted {
            return None;
        }
        Some(EventRecord::from_prepare(event_number, prepare))
    }

    fn stream_view<'a>(state: &'a IndexState, stream_id: &str) -> StreamView<'a> {
        match state.streams.get(stream_id) {
            None => StreamView::Absent,
            Some(entry) if entry.is_deleted => StreamView::Deleted,
            Some(entry) if entry.events.is_empty() => StreamView::Absent,
            Some(entry) => StreamView::Live(
                entry,
                state.metadata.get(stream_id).cloned().unwrap_or_default(),
            ),
        }
    }

    /// `(last, floor)`: the highest existing event number and the lowest
    /// visible one under the stream's retention policy.
    fn visible_range(
        entry: &StreamEntry,
        metadata: &StreamMetadata,
        now: DateTime<Utc>,
    ) -> (i64, i64) {
        let first = *entry.events.keys().next().expect("live stream has events");
        let last = *entry
            .events
            .keys()
            .next_back()
            .expect("live stream has events");

        let mut floor = first;
        if let Some(tb) = metadata.truncate_before {
            floor = floor.max(tb);
        }
        if let Some(max_count) = metadata.max_count {
            floor = floor.max(last - max_count as i64 + 1);
        }
        if let Some(max_age) = metadata.max_age {
            let cutoff_ms = (now - max_age).timestamp_millis();
            let mut age_floor = last + 1; // everything expired until proven otherwise
            for (&event_number, event) in entry.events.range(floor..) {
                if event.timestamp_ms >= cutoff_ms {
                    age_floor = event_number;
                    break;
                }
            }
            floor = floor.max(age_floor);
        }

        (last, floor)
    }

    fn fetch_event(&self, event_number: i64, event: &EventEntry) -> ChunkResult<EventRecord> {
        let result = self.log.read_at(event.position)?;
        match result.record {
            Some(LogRecord::Prepare(prepare)) if result.success => {
                Ok(EventRecord::from_prepare(event_number, &prepare))
            }
            _ => Err(ChunkError::record_corrupt(format!(
                "Index entry for event {} points at position {} which holds no committed prepare",
                event_number, event.position
            ))),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

enum StreamView<'a> {
    Absent,
    Deleted,
    Live(&'a StreamEntry, StreamMetadata),
}
