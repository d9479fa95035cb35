//! Transaction log record types and frame codec
//!
//! Every record on disk is a self-delimiting frame:
//!
//! - Frame Size (u32 LE): size of record type byte + payload
//! - Record Type (u8): PREPARE / COMMIT / SYSTEM
//! - Payload (variable, versioned)
//! - Frame Size again (u32 LE)
//!
//! The duplicated size field lets a reader walk the log forward or
//! backward from any record boundary without an external index, which is
//! what crash recovery and backward range reads rely on.
//!
//! Payloads start with a version byte. Unknown trailing payload bytes are
//! ignored on read, so newer writers can extend a payload without breaking
//! older readers.

use std::io::{self, Cursor, Read, Write};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Size of the frame size field, present at both ends of every record.
pub const FRAME_SIZE_LEN: usize = 4;

/// Upper bound on a single record's frame size field. Anything larger is
/// treated as corruption rather than an allocation request.
pub const MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

const PAYLOAD_VERSION: u8 = 0;

/// Record types as they appear on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// First phase of a write: the event body, bound to a transaction
    Prepare = 0,
    /// Second phase: finalizes the prepares of one transaction
    Commit = 1,
    /// Engine-internal record (epochs), never part of a stream
    System = 2,
}

impl RecordType {
    /// Convert from u8, returns None for unknown tags
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecordType::Prepare),
            1 => Some(RecordType::Commit),
            2 => Some(RecordType::System),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Prepare flag bits.
///
/// A plain single-event append carries DATA | TRANSACTION_BEGIN |
/// TRANSACTION_END. A hard delete carries STREAM_DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareFlags(u16);

impl PrepareFlags {
    pub const NONE: PrepareFlags = PrepareFlags(0);
    pub const DATA: PrepareFlags = PrepareFlags(0x01);
    pub const TRANSACTION_BEGIN: PrepareFlags = PrepareFlags(0x02);
    pub const TRANSACTION_END: PrepareFlags = PrepareFlags(0x04);
    pub const STREAM_DELETE: PrepareFlags = PrepareFlags(0x08);
    pub const IS_JSON: PrepareFlags = PrepareFlags(0x10);

    /// Flags for a self-contained single-event write.
    pub fn single_write() -> PrepareFlags {
        Self::DATA | Self::TRANSACTION_BEGIN | Self::TRANSACTION_END
    }

    pub fn contains(self, other: PrepareFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> PrepareFlags {
        PrepareFlags(bits)
    }
}

impl std::ops::BitOr for PrepareFlags {
    type Output = PrepareFlags;

    fn bitor(self, rhs: PrepareFlags) -> PrepareFlags {
        PrepareFlags(self.0 | rhs.0)
    }
}

/// System record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemRecordKind {
    /// Writer-generation marker
    Epoch = 0,
}

impl SystemRecordKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SystemRecordKind::Epoch),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// First-phase write record: one event, bound to a transaction.
///
/// For single-event writes `transaction_position` equals the prepare's own
/// `log_position` and `transaction_offset` is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRecord {
    /// Absolute position in the global log where this record begins
    pub log_position: u64,
    /// Correlates all records of one client operation
    pub correlation_id: Uuid,
    /// Identity of the event itself, assigned by the client
    pub event_id: Uuid,
    /// Position of the first prepare of the owning transaction
    pub transaction_position: u64,
    /// Index of this prepare within its transaction
    pub transaction_offset: i32,
    /// Stream the event belongs to
    pub event_stream_id: String,
    /// Version the writer expected the stream to be at (-1: no stream, -2: any)
    pub expected_version: i64,
    /// Wall-clock time of the write, millisecond precision
    pub timestamp: DateTime<Utc>,
    pub flags: PrepareFlags,
    pub event_type: String,
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl PrepareRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        log_position: u64,
        correlation_id: Uuid,
        event_id: Uuid,
        transaction_position: u64,
        transaction_offset: i32,
        event_stream_id: impl Into<String>,
        expected_version: i64,
        timestamp: DateTime<Utc>,
        flags: PrepareFlags,
        event_type: impl Into<String>,
        data: Vec<u8>,
        metadata: Vec<u8>,
    ) -> Self {
        Self {
            log_position,
            correlation_id,
            event_id,
            transaction_position,
            transaction_offset,
            event_stream_id: event_stream_id.into(),
            expected_version,
            timestamp: truncate_to_millis(timestamp),
            flags,
            event_type: event_type.into(),
            data,
            metadata,
        }
    }

    fn write_payload<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[PAYLOAD_VERSION])?;
        w.write_all(&self.log_position.to_le_bytes())?;
        w.write_all(self.correlation_id.as_bytes())?;
        w.write_all(self.event_id.as_bytes())?;
        w.write_all(&self.transaction_position.to_le_bytes())?;
        w.write_all(&self.transaction_offset.to_le_bytes())?;
        w.write_all(&self.expected_version.to_le_bytes())?;
        w.write_all(&self.timestamp.timestamp_millis().to_le_bytes())?;
        w.write_all(&self.flags.bits().to_le_bytes())?;
        write_string(w, &self.event_stream_id)?;
        write_string(w, &self.event_type)?;
        write_bytes(w, &self.data)?;
        write_bytes(w, &self.metadata)?;
        Ok(())
    }

    fn read_payload(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let _version = read_u8(&mut cursor)?;
        let log_position = read_u64(&mut cursor)?;
        let correlation_id = read_uuid(&mut cursor)?;
        let event_id = read_uuid(&mut cursor)?;
        let transaction_position = read_u64(&mut cursor)?;
        let transaction_offset = read_i32(&mut cursor)?;
        let expected_version = read_i64(&mut cursor)?;
        let timestamp = read_timestamp(&mut cursor)?;
        let flags = PrepareFlags::from_bits(read_u16(&mut cursor)?);
        let event_stream_id = read_string(&mut cursor)?;
        let event_type = read_string(&mut cursor)?;
        let data = read_len_bytes(&mut cursor)?;
        let metadata = read_len_bytes(&mut cursor)?;
        // Trailing bytes, if any, belong to a newer payload version.
        Ok(Self {
            log_position,
            correlation_id,
            event_id,
            transaction_position,
            transaction_offset,
            event_stream_id,
            expected_version,
            timestamp,
            flags,
            event_type,
            data,
            metadata,
        })
    }
}

/// Second-phase write record: finalizes one transaction's prepares and
/// fixes the event number of the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub log_position: u64,
    pub correlation_id: Uuid,
    /// Position of the first prepare of the committed transaction
    pub transaction_position: u64,
    /// Event number assigned to the prepare at `transaction_offset` 0
    pub first_event_number: i64,
    pub timestamp: DateTime<Utc>,
}

impl CommitRecord {
    pub fn new(
        log_position: u64,
        correlation_id: Uuid,
        transaction_position: u64,
        first_event_number: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            log_position,
            correlation_id,
            transaction_position,
            first_event_number,
            timestamp: truncate_to_millis(timestamp),
        }
    }

    fn write_payload<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[PAYLOAD_VERSION])?;
        w.write_all(&self.log_position.to_le_bytes())?;
        w.write_all(self.correlation_id.as_bytes())?;
        w.write_all(&self.transaction_position.to_le_bytes())?;
        w.write_all(&self.first_event_number.to_le_bytes())?;
        w.write_all(&self.timestamp.timestamp_millis().to_le_bytes())?;
        Ok(())
    }

    fn read_payload(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let _version = read_u8(&mut cursor)?;
        let log_position = read_u64(&mut cursor)?;
        let correlation_id = read_uuid(&mut cursor)?;
        let transaction_position = read_u64(&mut cursor)?;
        let first_event_number = read_i64(&mut cursor)?;
        let timestamp = read_timestamp(&mut cursor)?;
        Ok(Self {
            log_position,
            correlation_id,
            transaction_position,
            first_event_number,
            timestamp,
        })
    }
}

/// Engine-internal record. Not addressable through any stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRecord {
    pub log_position: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: SystemRecordKind,
    pub data: Vec<u8>,
}

impl SystemRecord {
    pub fn new(
        log_position: u64,
        timestamp: DateTime<Utc>,
        kind: SystemRecordKind,
        data: Vec<u8>,
    ) -> Self {
        Self {
            log_position,
            timestamp: truncate_to_millis(timestamp),
            kind,
            data,
        }
    }

    fn write_payload<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[PAYLOAD_VERSION])?;
        w.write_all(&self.log_position.to_le_bytes())?;
        w.write_all(&self.timestamp.timestamp_millis().to_le_bytes())?;
        w.write_all(&[self.kind.as_u8()])?;
        write_bytes(w, &self.data)?;
        Ok(())
    }

    fn read_payload(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let _version = read_u8(&mut cursor)?;
        let log_position = read_u64(&mut cursor)?;
        let timestamp = read_timestamp(&mut cursor)?;
        let kind_byte = read_u8(&mut cursor)?;
        let kind = SystemRecordKind::from_u8(kind_byte).ok_or_else(|| {
            invalid_data(format!("Unknown system record kind: {}", kind_byte))
        })?;
        let data = read_len_bytes(&mut cursor)?;
        Ok(Self {
            log_position,
            timestamp,
            kind,
            data,
        })
    }
}

/// A transaction log record: the closed union the codec dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Prepare(PrepareRecord),
    Commit(CommitRecord),
    System(SystemRecord),
}

impl LogRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            LogRecord::Prepare(_) => RecordType::Prepare,
            LogRecord::Commit(_) => RecordType::Commit,
            LogRecord::System(_) => RecordType::System,
        }
    }

    pub fn log_position(&self) -> u64 {
        match self {
            LogRecord::Prepare(r) => r.log_position,
            LogRecord::Commit(r) => r.log_position,
            LogRecord::System(r) => r.log_position,
        }
    }

    /// Re-stamps the position. The log writer calls this just before the
    /// bytes are placed, so the serialized position always matches the
    /// offset the record actually lands at. The serialized size does not
    /// change.
    pub fn set_log_position(&mut self, position: u64) {
        match self {
            LogRecord::Prepare(r) => {
                if r.transaction_position == r.log_position {
                    r.transaction_position = position;
                }
                r.log_position = position;
            }
            LogRecord::Commit(r) => r.log_position = position,
            LogRecord::System(r) => r.log_position = position,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogRecord::Prepare(r) => r.timestamp,
            LogRecord::Commit(r) => r.timestamp,
            LogRecord::System(r) => r.timestamp,
        }
    }

    /// Serializes the complete frame: size, type, payload, size again.
    pub fn serialize(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(64);
        let write_result = match self {
            LogRecord::Prepare(r) => r.write_payload(&mut payload),
            LogRecord::Commit(r) => r.write_payload(&mut payload),
            LogRecord::System(r) => r.write_payload(&mut payload),
        };
        // Writing into a Vec cannot fail.
        write_result.expect("Vec write cannot fail");

        let size = (1 + payload.len()) as u32;
        let mut frame = Vec::with_capacity(FRAME_SIZE_LEN * 2 + size as usize);
        frame.extend_from_slice(&size.to_le_bytes());
        frame.push(self.record_type().as_u8());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&size.to_le_bytes());
        frame
    }

    /// Total on-disk size of the serialized frame, prefix and suffix
    /// included.
    pub fn frame_size(&self) -> usize {
        self.serialize().len()
    }

    /// Deserializes one frame from the start of `data`, verifying both
    /// size fields agree.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(LogRecord, usize)> {
        // size prefix + type byte + size suffix
        const MIN_FRAME: usize = FRAME_SIZE_LEN + 1 + FRAME_SIZE_LEN;
        if data.len() < MIN_FRAME {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record frame too short",
            ));
        }

        let size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if size == 0 || size > MAX_RECORD_SIZE {
            return Err(invalid_data(format!("Invalid record size: {}", size)));
        }

        let total = FRAME_SIZE_LEN + size as usize + FRAME_SIZE_LEN;
        if data.len() < total {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Record truncated: frame needs {} bytes, got {}", total, data.len()),
            ));
        }

        let suffix_at = FRAME_SIZE_LEN + size as usize;
        let suffix = u32::from_le_bytes([
            data[suffix_at],
            data[suffix_at + 1],
            data[suffix_at + 2],
            data[suffix_at + 3],
        ]);
        if suffix != size {
            return Err(invalid_data(format!(
                "Frame size fields disagree: prefix {}, suffix {}",
                size, suffix
            )));
        }

        let type_byte = data[FRAME_SIZE_LEN];
        let record_type = RecordType::from_u8(type_byte)
            .ok_or_else(|| invalid_data(format!("Unknown record type: {}", type_byte)))?;

        let payload = &data[FRAME_SIZE_LEN + 1..suffix_at];
        let record = match record_type {
            RecordType::Prepare => LogRecord::Prepare(PrepareRecord::read_payload(payload)?),
            RecordType::Commit => LogRecord::Commit(CommitRecord::read_payload(payload)?),
            RecordType::System => LogRecord::System(SystemRecord::read_payload(payload)?),
        };

        Ok((record, total))
    }
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u32).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn write_bytes<W: Write>(w: &mut W, b: &[u8]) -> io::Result<()> {
    w.write_all(&(b.len() as u32).to_le_bytes())?;
    w.write_all(b)
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_uuid<R: Read>(r: &mut R) -> io::Result<Uuid> {
    let mut buf = [0u8; 16];
    r.read_exact(&mut buf)?;
    Ok(Uuid::from_bytes(buf))
}

fn read_timestamp<R: Read>(r: &mut R) -> io::Result<DateTime<Utc>> {
    let millis = read_i64(r)?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| invalid_data(format!("Timestamp out of range: {}", millis)))
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let bytes = read_len_bytes(r)?;
    String::from_utf8(bytes)
        .map_err(|e| invalid_data(format!("Invalid UTF-8: {}", e)))
}

fn read_len_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_RECORD_SIZE {
        return Err(invalid_data(format!("Field length too large: {}", len)));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(946_728_000_000).single().unwrap()
    }

    fn sample_prepare(stream: &str) -> PrepareRecord {
        PrepareRecord::new(
            0,
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            0,
            stream,
            -2,
            fixed_time(),
            PrepareFlags::single_write(),
            "order-placed",
            b"{\"total\": 12}".to_vec(),
            Vec::new(),
        )
    }

    #[test]
    fn test_record_type_roundtrip() {
        for record_type in [RecordType::Prepare, RecordType::Commit, RecordType::System] {
            assert_eq!(RecordType::from_u8(record_type.as_u8()), Some(record_type));
        }
    }

    #[test]
    fn test_unknown_record_type_rejected() {
        assert!(RecordType::from_u8(3).is_none());
        assert!(RecordType::from_u8(255).is_none());
    }

    #[test]
    fn test_flags_compose() {
        let flags = PrepareFlags::single_write();
        assert!(flags.contains(PrepareFlags::DATA));
        assert!(flags.contains(PrepareFlags::TRANSACTION_BEGIN));
        assert!(flags.contains(PrepareFlags::TRANSACTION_END));
        assert!(!flags.contains(PrepareFlags::STREAM_DELETE));
        assert!(!flags.contains(PrepareFlags::IS_JSON));
    }

    #[test]
    fn test_prepare_roundtrip() {
        let record = LogRecord::Prepare(sample_prepare("orders-17"));
        let frame = record.serialize();
        let (decoded, consumed) = LogRecord::deserialize(&frame).unwrap();
        assert_eq!(record, decoded);
        assert_eq!(consumed, frame.len());
    }

    #[test]
    fn test_commit_roundtrip() {
        let record = LogRecord::Commit(CommitRecord::new(
            128,
            Uuid::new_v4(),
            64,
            5,
            fixed_time(),
        ));
        let frame = record.serialize();
        let (decoded, consumed) = LogRecord::deserialize(&frame).unwrap();
        assert_eq!(record, decoded);
        assert_eq!(consumed, frame.len());
    }

    #[test]
    fn test_system_roundtrip() {
        let record = LogRecord::System(SystemRecord::new(
            256,
            fixed_time(),
            SystemRecordKind::Epoch,
            b"epoch-1".to_vec(),
        ));
        let frame = record.serialize();
        let (decoded, _) = LogRecord::deserialize(&frame).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_frame_has_matching_prefix_and_suffix() {
        let frame = LogRecord::Prepare(sample_prepare("s")).serialize();
        let prefix = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let n = frame.len();
        let suffix = u32::from_le_bytes([frame[n - 4], frame[n - 3], frame[n - 2], frame[n - 1]]);
        assert_eq!(prefix, suffix);
        assert_eq!(prefix as usize, frame.len() - 2 * FRAME_SIZE_LEN);
    }

    #[test]
    fn test_mismatched_suffix_rejected() {
        let mut frame = LogRecord::Prepare(sample_prepare("s")).serialize();
        let n = frame.len();
        frame[n - 1] ^= 0xFF;
        let err = LogRecord::deserialize(&frame).unwrap_err();
        assert!(err.to_string().contains("disagree"));
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        let mut frame = LogRecord::Prepare(sample_prepare("s")).serialize();
        frame[FRAME_SIZE_LEN] = 7;
        let err = LogRecord::deserialize(&frame).unwrap_err();
        assert!(err.to_string().contains("Unknown record type"));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = LogRecord::Prepare(sample_prepare("s")).serialize();
        let result = LogRecord::deserialize(&frame[..frame.len() - 6]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_size_rejected() {
        let frame = [0u8; 16];
        assert!(LogRecord::deserialize(&frame).is_err());
    }

    #[test]
    fn test_trailing_payload_bytes_tolerated() {
        // A newer payload version may append fields; today's reader must
        // ignore them rather than reject the record.
        let record = sample_prepare("orders-17");
        let mut payload = Vec::new();
        record.write_payload(&mut payload).unwrap();
        payload.extend_from_slice(b"future-field");

        let size = (1 + payload.len()) as u32;
        let mut frame = Vec::new();
        frame.extend_from_slice(&size.to_le_bytes());
        frame.push(RecordType::Prepare.as_u8());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&size.to_le_bytes());

        let (decoded, _) = LogRecord::deserialize(&frame).unwrap();
        assert_eq!(LogRecord::Prepare(record), decoded);
    }

    #[test]
    fn test_deterministic_serialization() {
        let record = LogRecord::Prepare(sample_prepare("orders-17"));
        assert_eq!(record.serialize(), record.serialize());
    }

    #[test]
    fn test_set_log_position_keeps_size() {
        let mut record = LogRecord::Prepare(sample_prepare("orders-17"));
        let before = record.frame_size();
        record.set_log_position(u64::MAX / 2);
        assert_eq!(record.frame_size(), before);
        assert_eq!(record.log_position(), u64::MAX / 2);
    }

    #[test]
    fn test_set_log_position_moves_transaction_position_of_single_write() {
        let mut record = LogRecord::Prepare(sample_prepare("orders-17"));
        record.set_log_position(4096);
        match record {
            LogRecord::Prepare(p) => assert_eq!(p.transaction_position, 4096),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_timestamp_millisecond_precision_survives_roundtrip() {
        let record = LogRecord::Prepare(PrepareRecord::new(
            0,
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            0,
            "s",
            -2,
            Utc::now(),
            PrepareFlags::single_write(),
            "t",
            Vec::new(),
            Vec::new(),
        ));
        let (decoded, _) = LogRecord::deserialize(&record.serialize()).unwrap();
        assert_eq!(record, decoded);
    }
}
