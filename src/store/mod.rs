//! Boundary with the ordered-log store.
//!
//! Everything this crate knows about the remote log goes through the
//! [`LogStore`] trait: inclusive range scans in either direction, blocking
//! tail reads from a cursor, and the server clock. Entry ids follow the
//! `<timestamp_ms>-<sequence>` format and entries carry a field map that must
//! contain a `frame` key with the encoded payload.
//!
//! The crate ships one backend, [`RedisLogStore`], behind the `redis` cargo
//! feature. Tests run against an in-memory store.

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::RedisLogStore;

use crate::error::Result;

/// Inclusive lower bound covering the whole log in range scans.
pub const RANGE_MIN: &str = "-";
/// Inclusive upper bound covering the whole log in range scans.
pub const RANGE_MAX: &str = "+";

/// Field name carrying the encoded payload in every video entry.
pub const FRAME_FIELD: &str = "frame";

/// Server-side clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTime {
    /// Whole seconds since the epoch.
    pub seconds: i64,
    /// Microseconds within the current second.
    pub micros: i64,
}

impl ServerTime {
    /// The clock reading as log-timestamp milliseconds.
    ///
    /// Truncates to whole seconds before scaling, matching the resolution the
    /// upstream publisher keys entries with.
    pub fn to_millis(self) -> i64 {
        (self.seconds as f64 + self.micros as f64 / 1_000_000.0) as i64 * 1000
    }
}

/// One entry read from the ordered log: its id plus a field map.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Serialized entry id, `<timestamp_ms>-<sequence>`.
    pub id: String,
    /// Field name/value pairs in store order.
    pub fields: Vec<(String, Vec<u8>)>,
}

impl LogEntry {
    /// Look up a field's value by name.
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_slice())
    }
}

/// Read access to a remote ordered log.
///
/// Implementations abstract over the concrete store (Redis Streams in
/// production, an in-memory log in tests). All reads return entries in
/// id order; `read_reverse_range` newest-first. Errors are I/O-level and
/// surface as [`StreamError::Store`](crate::StreamError::Store).
#[async_trait::async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// The store's clock, used to anchor live polling and session timeouts.
    async fn server_time(&self) -> Result<ServerTime>;

    /// Inclusive range scan, oldest first, at most `count` entries.
    ///
    /// `min`/`max` are entry ids, bare millisecond timestamps, or the
    /// [`RANGE_MIN`]/[`RANGE_MAX`] sentinels.
    async fn read_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>>;

    /// Inclusive range scan, newest first, at most `count` entries.
    async fn read_reverse_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>>;

    /// Blocking tail read: entries strictly after `from`, waiting up to
    /// `block_ms` for new data. `count` of `None` means "everything
    /// available".
    async fn read_from(
        &self,
        stream: &str,
        from: &str,
        block_ms: u64,
        count: Option<usize>,
    ) -> Result<Vec<LogEntry>>;
}
