//! Per-stream retention metadata
//!
//! Metadata travels inside the log as ordinary committed events: the
//! stream's creation event carries a JSON document in its metadata field,
//! and later `$metadata` events carry a replacement document in their data
//! field. The read index never mutates metadata; it only parses and
//! caches what the write path committed.
//!
//! Recognized keys: `$maxCount`, `$maxAge` (seconds), `$tb`
//! (truncate-before event number, set by soft deletion).

use chrono::Duration;
use serde::Deserialize;

/// Event type of a stream's first event.
pub const STREAM_CREATED_EVENT_TYPE: &str = "$stream-created";

/// Event type carrying a metadata replacement document.
pub const METADATA_EVENT_TYPE: &str = "$metadata";

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "$maxCount")]
    max_count: Option<u64>,
    #[serde(rename = "$maxAge")]
    max_age_secs: Option<i64>,
    #[serde(rename = "$tb")]
    truncate_before: Option<i64>,
}

/// Retention policy of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Only the newest `max_count` events are visible
    pub max_count: Option<u64>,
    /// Events older than this are invisible
    pub max_age: Option<Duration>,
    /// Events below this number are invisible (soft deletion)
    pub truncate_before: Option<i64>,
}

impl StreamMetadata {
    /// Parses a metadata JSON document.
    ///
    /// Returns None for empty or malformed input: retention is a policy
    /// hint, and a stream with unreadable metadata behaves like one with
    /// none.
    pub fn parse(bytes: &[u8]) -> Option<StreamMetadata> {
        if bytes.is_empty() {
            return None;
        }
        let raw: RawMetadata = serde_json::from_slice(bytes).ok()?;
        Some(StreamMetadata {
            max_count: raw.max_count,
            max_age: raw.max_age_secs.map(Duration::seconds),
            truncate_before: raw.truncate_before,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.max_count.is_none() && self.max_age.is_none() && self.truncate_before.is_none()
    }
}
