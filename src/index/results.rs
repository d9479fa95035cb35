//! Read result types
//!
//! "Stream absent" and "stream deleted" are normal outcomes, not faults,
//! so they travel in result values; only I/O and integrity failures use
//! the error channel.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::{PrepareFlags, PrepareRecord};

/// Outcome of a range read against one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStreamResult {
    Success,
    /// The stream was never created
    NoStream,
    /// The stream is tombstoned and can never be recreated
    StreamDeleted,
}

/// Outcome of a single-event read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEventResult {
    Success,
    /// The stream exists but the event number is absent or expired
    NotFound,
    NoStream,
    StreamDeleted,
}

/// One resolved, client-visible event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_stream_id: String,
    pub event_number: i64,
    /// Position of the backing prepare in the global log
    pub log_position: u64,
    pub event_id: Uuid,
    pub event_type: String,
    pub is_json: bool,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl EventRecord {
    /// Resolves a committed prepare into its client-visible form.
    pub fn from_prepare(event_number: i64, prepare: &PrepareRecord) -> Self {
        Self {
            event_stream_id: prepare.event_stream_id.clone(),
            event_number,
            log_position: prepare.log_position,
            event_id: prepare.event_id,
            event_type: prepare.event_type.clone(),
            is_json: prepare.flags.contains(PrepareFlags::IS_JSON),
            timestamp: prepare.timestamp,
            data: prepare.data.clone(),
            metadata: prepare.metadata.clone(),
        }
    }
}

/// Result of a forward or backward range read. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeReadResult {
    pub result: ReadStreamResult,
    pub records: Vec<EventRecord>,
    /// Event number to pass as `start` on the next call to continue
    pub next_event_number: i64,
    /// Highest existing event number, reported even with no records
    pub last_event_number: i64,
    pub is_end_of_stream: bool,
}

impl RangeReadResult {
    pub fn no_stream() -> Self {
        Self {
            result: ReadStreamResult::NoStream,
            records: Vec::new(),
            next_event_number: -1,
            last_event_number: -1,
            is_end_of_stream: true,
        }
    }

    pub fn stream_deleted() -> Self {
        Self {
            result: ReadStreamResult::StreamDeleted,
            records: Vec::new(),
            next_event_number: -1,
            last_event_number: -1,
            is_end_of_stream: true,
        }
    }
}

/// Result of a single-event read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReadResult {
    pub result: ReadEventResult,
    pub record: Option<EventRecord>,
}

impl EventReadResult {
    pub fn found(record: EventRecord) -> Self {
        Self {
            result: ReadEventResult::Success,
            record: Some(record),
        }
    }

    pub fn absent(result: ReadEventResult) -> Self {
        Self {
            result,
            record: None,
        }
    }
}

/// A finite slice of a whole-log scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllEventsSlice {
    pub records: Vec<EventRecord>,
    /// Position to resume the scan from
    pub next_position: u64,
}
