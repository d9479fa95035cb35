//! Chunk and log error types
//!
//! Error codes:
//! - TIDE_CHUNK_IO (ERROR severity): file-system failure, not retried here
//! - TIDE_RECORD_CORRUPT (FATAL severity): frame or payload damage
//! - TIDE_HASH_MISMATCH (FATAL severity): footer digest disagreement
//! - TIDE_CHUNK_SEALED (ERROR severity): append after completion
//! - TIDE_CHUNK_FULL (ERROR severity): record larger than remaining space
//! - TIDE_CHECKPOINT_CORRUPT (FATAL severity): writer checkpoint damage
//!
//! TIDE_CHUNK_FULL never reaches an append caller: the chunked log rolls
//! to the next chunk instead. Everything else surfaces.

use std::fmt;
use std::io;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, engine continues
    Error,
    /// Integrity is in question, the engine must stop and recover
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-engine error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkErrorCode {
    /// File-system failure during a chunk operation
    TideChunkIo,
    /// Record frame or payload failed to deserialize
    TideRecordCorrupt,
    /// Completed chunk content hash does not match its footer
    TideHashMismatch,
    /// Append attempted on a completed chunk
    TideChunkSealed,
    /// Record does not fit in the chunk's remaining capacity
    TideChunkFull,
    /// Writer checkpoint file failed its CRC
    TideCheckpointCorrupt,
}

impl ChunkErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ChunkErrorCode::TideChunkIo => "TIDE_CHUNK_IO",
            ChunkErrorCode::TideRecordCorrupt => "TIDE_RECORD_CORRUPT",
            ChunkErrorCode::TideHashMismatch => "TIDE_HASH_MISMATCH",
            ChunkErrorCode::TideChunkSealed => "TIDE_CHUNK_SEALED",
            ChunkErrorCode::TideChunkFull => "TIDE_CHUNK_FULL",
            ChunkErrorCode::TideCheckpointCorrupt => "TIDE_CHECKPOINT_CORRUPT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ChunkErrorCode::TideChunkIo => Severity::Error,
            ChunkErrorCode::TideRecordCorrupt => Severity::Fatal,
            ChunkErrorCode::TideHashMismatch => Severity::Fatal,
            ChunkErrorCode::TideChunkSealed => Severity::Error,
            ChunkErrorCode::TideChunkFull => Severity::Error,
            ChunkErrorCode::TideCheckpointCorrupt => Severity::Fatal,
        }
    }
}

impl fmt::Display for ChunkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional I/O source
#[derive(Debug)]
pub struct ChunkError {
    code: ChunkErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl ChunkError {
    /// File-system failure with its underlying I/O error
    pub fn io_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ChunkErrorCode::TideChunkIo,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Record corruption detected while decoding
    pub fn record_corrupt(message: impl Into<String>) -> Self {
        Self {
            code: ChunkErrorCode::TideRecordCorrupt,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Record corruption with the local offset it was detected at
    pub fn corrupt_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: ChunkErrorCode::TideRecordCorrupt,
            message: reason.into(),
            details: Some(format!("local_offset: {}", offset)),
            source: None,
        }
    }

    /// Footer hash disagreement on a completed chunk
    pub fn hash_mismatch(chunk_number: u32, message: impl Into<String>) -> Self {
        Self {
            code: ChunkErrorCode::TideHashMismatch,
            message: message.into(),
            details: Some(format!("chunk_number: {}", chunk_number)),
            source: None,
        }
    }

    /// Append attempted after `complete()`
    pub fn sealed(chunk_number: u32) -> Self {
        Self {
            code: ChunkErrorCode::TideChunkSealed,
            message: "Append attempted on a completed chunk".to_string(),
            details: Some(format!("chunk_number: {}", chunk_number)),
            source: None,
        }
    }

    /// Record too large for the chunk's remaining capacity
    pub fn chunk_full(needed: u64, available: u64) -> Self {
        Self {
            code: ChunkErrorCode::TideChunkFull,
            message: format!(
                "Record needs {} bytes, chunk has {} remaining",
                needed, available
            ),
            details: None,
            source: None,
        }
    }

    /// Writer checkpoint failed validation
    pub fn checkpoint_corrupt(message: impl Into<String>) -> Self {
        Self {
            code: ChunkErrorCode::TideCheckpointCorrupt,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ChunkErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Whether the error questions on-disk integrity
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Whether this is the expected capacity failure the roll path handles
    pub fn is_chunk_full(&self) -> bool {
        self.code == ChunkErrorCode::TideChunkFull
    }

    /// Whether this is an append-after-complete protocol error
    pub fn is_sealed(&self) -> bool {
        self.code == ChunkErrorCode::TideChunkSealed
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for chunk and log operations
pub type ChunkResult<T> = Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ChunkErrorCode::TideChunkIo.code(), "TIDE_CHUNK_IO");
        assert_eq!(ChunkErrorCode::TideRecordCorrupt.code(), "TIDE_RECORD_CORRUPT");
        assert_eq!(ChunkErrorCode::TideHashMismatch.code(), "TIDE_HASH_MISMATCH");
        assert_eq!(ChunkErrorCode::TideChunkSealed.code(), "TIDE_CHUNK_SEALED");
        assert_eq!(ChunkErrorCode::TideChunkFull.code(), "TIDE_CHUNK_FULL");
        assert_eq!(
            ChunkErrorCode::TideCheckpointCorrupt.code(),
            "TIDE_CHECKPOINT_CORRUPT"
        );
    }

    #[test]
    fn test_integrity_errors_are_fatal() {
        assert!(ChunkError::record_corrupt("bad frame").is_fatal());
        assert!(ChunkError::hash_mismatch(3, "digest differs").is_fatal());
        assert!(ChunkError::checkpoint_corrupt("crc").is_fatal());
    }

    #[test]
    fn test_expected_errors_are_not_fatal() {
        assert!(!ChunkError::chunk_full(100, 10).is_fatal());
        assert!(!ChunkError::sealed(0).is_fatal());
        let io = io::Error::new(io::ErrorKind::Other, "disk full");
        assert!(!ChunkError::io_failed("write failed", io).is_fatal());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(ChunkError::chunk_full(100, 10).is_chunk_full());
        assert!(!ChunkError::chunk_full(100, 10).is_sealed());
        assert!(ChunkError::sealed(1).is_sealed());
    }

    #[test]
    fn test_display_carries_code_and_details() {
        let err = ChunkError::corrupt_at_offset(42, "size fields disagree");
        let display = format!("{}", err);
        assert!(display.contains("TIDE_RECORD_CORRUPT"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("size fields disagree"));
        assert!(display.contains("local_offset: 42"));
    }
}
