//! Shared test doubles: an in-memory ordered log and a stub decoder.
//!
//! The memory store mirrors the real store's read semantics closely enough
//! for the retrieval engines to be exercised end to end: inclusive range
//! bounds in both directions, strictly-after tail reads, and a manually
//! advanced server clock so tests control time instead of sleeping through
//! it.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::chunker::Chunker;
use crate::config::StreamConfig;
use crate::decode::{DecodedImage, DecoderFactory, FrameDecoder};
use crate::error::{Result, StreamError};
use crate::store::{FRAME_FIELD, LogEntry, LogStore, RANGE_MAX, RANGE_MIN, ServerTime};
use crate::types::FrameKind;

/// Longest a "blocking" read on the memory store actually waits. Keeps tests
/// fast while preserving the tail-read shape of the real store.
const MAX_SIMULATED_BLOCK_MS: u64 = 25;

struct MemoryLog {
    entries: Vec<((i64, u64), LogEntry)>,
    now_ms: i64,
    failing: bool,
    reads_failing: bool,
}

/// In-memory [`LogStore`] with a controllable clock and failure switches.
///
/// Clones share the same log, so a test can keep a handle and flip state
/// while a [`MediaStream`](crate::MediaStream) owns another.
#[derive(Clone)]
pub struct MemoryLogStore {
    stream: String,
    log: std::sync::Arc<Mutex<MemoryLog>>,
}

impl MemoryLogStore {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            log: std::sync::Arc::new(Mutex::new(MemoryLog {
                entries: Vec::new(),
                now_ms: 0,
                failing: false,
                reads_failing: false,
            })),
        }
    }

    /// Append an entry; entries are kept in id order regardless of push order.
    pub fn push(&self, entry: LogEntry) {
        let key = parse_id(&entry.id).expect("test entries use well-formed ids");
        let mut log = self.log.lock().expect("memory log lock");
        log.entries.push((key, entry));
        log.entries.sort_by_key(|(key, _)| *key);
    }

    /// Set the server clock, in log-timestamp milliseconds.
    pub fn set_now_ms(&self, now_ms: i64) {
        self.log.lock().expect("memory log lock").now_ms = now_ms;
    }

    /// When failing, every store operation returns an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.log.lock().expect("memory log lock").failing = failing;
    }

    /// When set, only the read operations fail; the server clock stays
    /// healthy. Exercises retry paths without breaking session bookkeeping.
    pub fn set_reads_failing(&self, reads_failing: bool) {
        self.log.lock().expect("memory log lock").reads_failing = reads_failing;
    }

    fn check_stream(&self, stream: &str, operation: &str) -> Result<()> {
        if stream != self.stream {
            return Err(StreamError::store_error(
                operation.to_string(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("unknown stream {stream}"),
                ),
            ));
        }
        Ok(())
    }

    fn fail_if_requested(&self, operation: &str) -> Result<()> {
        if self.log.lock().expect("memory log lock").failing {
            return Err(StreamError::store_error(
                operation.to_string(),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "store failing"),
            ));
        }
        Ok(())
    }

    fn fail_read_if_requested(&self, operation: &str) -> Result<()> {
        self.fail_if_requested(operation)?;
        if self.log.lock().expect("memory log lock").reads_failing {
            return Err(StreamError::store_error(
                operation.to_string(),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reads failing"),
            ));
        }
        Ok(())
    }

    fn select(
        &self,
        min: (i64, u64),
        max: (i64, u64),
        count: usize,
        newest_first: bool,
    ) -> Vec<LogEntry> {
        let log = self.log.lock().expect("memory log lock");
        let in_range = log
            .entries
            .iter()
            .filter(|(key, _)| *key >= min && *key <= max)
            .map(|(_, entry)| entry.clone());
        if newest_first {
            let mut selected: Vec<LogEntry> = in_range.collect();
            selected.reverse();
            selected.truncate(count);
            selected
        } else {
            in_range.take(count).collect()
        }
    }

    fn after(&self, from: (i64, u64), count: Option<usize>) -> Vec<LogEntry> {
        let log = self.log.lock().expect("memory log lock");
        let newer = log
            .entries
            .iter()
            .filter(|(key, _)| *key > from)
            .map(|(_, entry)| entry.clone());
        match count {
            Some(count) => newer.take(count).collect(),
            None => newer.collect(),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn server_time(&self) -> Result<ServerTime> {
        self.fail_if_requested("server_time")?;
        let now_ms = self.log.lock().expect("memory log lock").now_ms;
        Ok(ServerTime { seconds: now_ms.div_euclid(1000), micros: now_ms.rem_euclid(1000) * 1000 })
    }

    async fn read_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>> {
        self.fail_read_if_requested("read_range")?;
        self.check_stream(stream, "read_range")?;
        Ok(self.select(parse_bound(min, false)?, parse_bound(max, true)?, count, false))
    }

    async fn read_reverse_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>> {
        self.fail_read_if_requested("read_reverse_range")?;
        self.check_stream(stream, "read_reverse_range")?;
        Ok(self.select(parse_bound(min, false)?, parse_bound(max, true)?, count, true))
    }

    async fn read_from(
        &self,
        stream: &str,
        from: &str,
        block_ms: u64,
        count: Option<usize>,
    ) -> Result<Vec<LogEntry>> {
        self.fail_read_if_requested("read_from")?;
        self.check_stream(stream, "read_from")?;
        let from = parse_bound(from, false)?;

        let entries = self.after(from, count);
        if !entries.is_empty() {
            return Ok(entries);
        }

        // Simulate the blocking wait, bounded so tests stay quick.
        tokio::time::sleep(Duration::from_millis(block_ms.min(MAX_SIMULATED_BLOCK_MS))).await;
        Ok(self.after(from, count))
    }
}

fn parse_id(id: &str) -> Result<(i64, u64)> {
    let (ts, seq) = id
        .split_once('-')
        .ok_or_else(|| StreamError::parse_error("entry id", format!("no separator in {id}")))?;
    let ts = ts
        .parse()
        .map_err(|_| StreamError::parse_error("entry id", format!("bad timestamp in {id}")))?;
    let seq = seq
        .parse()
        .map_err(|_| StreamError::parse_error("entry id", format!("bad sequence in {id}")))?;
    Ok((ts, seq))
}

/// Parse a range bound the way the real store does: the open-range sentinels,
/// a full `<ts>-<seq>` id, or a bare millisecond timestamp that covers the
/// whole millisecond on the upper side.
fn parse_bound(bound: &str, upper: bool) -> Result<(i64, u64)> {
    match bound {
        RANGE_MIN => Ok((i64::MIN, 0)),
        RANGE_MAX => Ok((i64::MAX, u64::MAX)),
        id if id.contains('-') => parse_id(id),
        ts => {
            let ts = ts
                .parse()
                .map_err(|_| StreamError::parse_error("range bound", format!("bad bound {ts}")))?;
            Ok(if upper { (ts, u64::MAX) } else { (ts, 0) })
        }
    }
}

/// Decoder stub keyed on the payload's first byte: `I`, `P`, or `B` select
/// the frame kind. Empty payloads fail to decode.
#[derive(Default)]
pub struct StubDecoder;

impl FrameDecoder for StubDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedImage>> {
        let Some(first) = payload.first() else {
            return Err(StreamError::decode_failed("empty payload"));
        };
        let kind = match first {
            b'I' => FrameKind::Independent,
            b'B' => FrameKind::Predicted,
            _ => FrameKind::Dependent,
        };
        Ok(vec![DecodedImage { pixels: vec![0u8; 2 * 2 * 3], width: 2, height: 2, kind }])
    }
}

pub struct StubDecoderFactory;

impl DecoderFactory for StubDecoderFactory {
    fn create(&self) -> Result<Box<dyn FrameDecoder + Send>> {
        Ok(Box::new(StubDecoder))
    }
}

/// A log entry carrying `payload` under the frame field.
pub fn frame_entry(timestamp_ms: i64, sequence: u64, payload: &[u8]) -> LogEntry {
    LogEntry {
        id: format!("{timestamp_ms}-{sequence}"),
        fields: vec![(FRAME_FIELD.to_string(), payload.to_vec())],
    }
}

pub fn stub_chunker() -> Chunker {
    Chunker::new(Box::new(StubDecoder))
}

/// Defaults with a short read block so tail reads do not slow tests down.
pub fn test_config() -> StreamConfig {
    StreamConfig { read_block_ms: 25, ..StreamConfig::for_stream("video") }
}
