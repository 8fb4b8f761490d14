//! Log positions: entry ids, cursors, and raw packets.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StreamError};

/// Parsed form of an ordered-log entry id, `<timestamp_ms>-<sequence>`.
///
/// The timestamp component is the sort and filter key throughout this crate;
/// the sequence number only breaks ties between entries sharing a
/// millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryId {
    /// Millisecond timestamp component.
    pub timestamp_ms: i64,
    /// Tie-breaking sequence component.
    pub sequence: u64,
}

impl FromStr for EntryId {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        let (ts, seq) = s
            .split_once('-')
            .ok_or_else(|| StreamError::parse_error("entry id", format!("missing '-' in {s:?}")))?;
        let timestamp_ms = ts
            .parse()
            .map_err(|e| StreamError::parse_error("entry id", format!("timestamp in {s:?}: {e}")))?;
        let sequence = seq
            .parse()
            .map_err(|e| StreamError::parse_error("entry id", format!("sequence in {s:?}: {e}")))?;
        Ok(Self { timestamp_ms, sequence })
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp_ms, self.sequence)
    }
}

/// An opaque position in the ordered log.
///
/// Holds the serialized id the store expects plus the parsed millisecond
/// timestamp used for drift and cutoff comparisons. A fresh cursor built from
/// a bare timestamp addresses the position just before sequence 0 of that
/// millisecond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    id: String,
    timestamp_ms: i64,
}

impl Cursor {
    /// Start position at a bare millisecond timestamp.
    pub fn from_timestamp(timestamp_ms: i64) -> Self {
        Self { id: timestamp_ms.to_string(), timestamp_ms }
    }

    /// Position of a concrete entry id returned by the store.
    pub fn from_entry_id(id: &str) -> Result<Self> {
        let parsed: EntryId = id.parse()?;
        Ok(Self { id: id.to_string(), timestamp_ms: parsed.timestamp_ms })
    }

    /// Serialized form, as the store expects it.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Millisecond timestamp component of the position.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// One opaque encoded payload plus its position in the log.
///
/// Read from the store, consumed exactly once by a decoder, then dropped.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Millisecond timestamp parsed from the entry id.
    pub timestamp: i64,
    /// Raw encoded bytes.
    pub payload: Vec<u8>,
}
