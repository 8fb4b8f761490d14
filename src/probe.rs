//! Coverage and frame-rate estimation for the log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StreamConfig;
use crate::error::Result;
use crate::store::{LogStore, RANGE_MAX, RANGE_MIN};
use crate::types::EntryId;

/// Estimated coverage window and frame rate of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Timestamp of the oldest buffered entry, ms.
    pub start_timestamp: i64,
    /// Timestamp of the newest buffered entry, ms.
    pub end_timestamp: i64,
    /// Buffered duration in whole seconds, rounded up.
    pub duration: i64,
    /// Frame rate estimated from a short sample at the start of the log.
    pub fps: u32,
}

impl ProbeInfo {
    fn new(start_timestamp: i64, end_timestamp: i64, fps: u32) -> Self {
        // div_ceil is only stable on unsigned integers.
        let duration = ((end_timestamp - start_timestamp).max(0) as u64).div_ceil(1000) as i64;
        Self { start_timestamp, end_timestamp, duration, fps }
    }

    fn empty() -> Self {
        Self { start_timestamp: 0, end_timestamp: 0, duration: 0, fps: 0 }
    }
}

/// Queries the log's oldest and newest entries plus a short sample to build a
/// [`ProbeInfo`].
pub struct StreamProbe<S> {
    store: Arc<S>,
    stream: String,
    sample_count: usize,
}

impl<S: LogStore> StreamProbe<S> {
    pub fn new(store: Arc<S>, config: &StreamConfig) -> Self {
        Self { store, stream: config.stream.clone(), sample_count: config.probe_sample }
    }

    /// Probe the stream. All fields are zero when the log is empty.
    ///
    /// Read-only with no side effects: probing twice against an unchanged log
    /// returns identical results.
    pub async fn info(&self) -> Result<ProbeInfo> {
        let newest =
            self.store.read_reverse_range(&self.stream, RANGE_MIN, RANGE_MAX, 1).await?;
        let Some(end_timestamp) = newest.first().and_then(|e| entry_timestamp(&e.id)) else {
            debug!(stream = %self.stream, "probe found empty log");
            return Ok(ProbeInfo::empty());
        };

        let sample =
            self.store.read_range(&self.stream, RANGE_MIN, RANGE_MAX, self.sample_count).await?;
        let Some(start_timestamp) = sample.first().and_then(|e| entry_timestamp(&e.id)) else {
            return Ok(ProbeInfo::empty());
        };
        let sample_end =
            sample.last().and_then(|e| entry_timestamp(&e.id)).unwrap_or(start_timestamp);

        // fps from entry density over the sample's time span. A degenerate
        // span (single entry, or the whole sample inside one millisecond)
        // yields zero rather than dividing by it.
        let span_ms = (sample_end - start_timestamp).abs();
        let fps = if span_ms > 0 {
            (sample.len() as f64 / span_ms as f64 * 1000.0).floor() as u32
        } else {
            0
        };

        let info = ProbeInfo::new(start_timestamp, end_timestamp, fps);
        debug!(
            start = info.start_timestamp,
            end = info.end_timestamp,
            duration = info.duration,
            fps = info.fps,
            "stream probed"
        );
        Ok(info)
    }
}

fn entry_timestamp(id: &str) -> Option<i64> {
    id.parse::<EntryId>().ok().map(|id| id.timestamp_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryLogStore, frame_entry};

    fn probe_over(store: Arc<MemoryLogStore>) -> StreamProbe<MemoryLogStore> {
        StreamProbe::new(store, &StreamConfig::default())
    }

    #[tokio::test]
    async fn duration_spans_first_to_last_entry() {
        let store = Arc::new(MemoryLogStore::new("video"));
        store.push(frame_entry(1_000, 0, b"I.."));
        store.push(frame_entry(31_000, 0, b"P.."));
        store.push(frame_entry(61_000, 0, b"P.."));

        let info = probe_over(store).info().await.expect("probe ok");
        assert_eq!(info.start_timestamp, 1_000);
        assert_eq!(info.end_timestamp, 61_000);
        assert_eq!(info.duration, 60);
        assert!(info.start_timestamp <= info.end_timestamp);
    }

    #[tokio::test]
    async fn partial_trailing_second_rounds_duration_up() {
        let store = Arc::new(MemoryLogStore::new("video"));
        store.push(frame_entry(1_000, 0, b"I.."));
        store.push(frame_entry(4_500, 0, b"P.."));

        let info = probe_over(store).info().await.expect("probe ok");
        assert_eq!(info.duration, 4);
    }

    #[tokio::test]
    async fn fps_estimated_from_sample_density() {
        let store = Arc::new(MemoryLogStore::new("video"));
        // 25 entries, 40ms apart: 960ms span => floor(25 / 960 * 1000) = 26.
        for i in 0..25 {
            store.push(frame_entry(1_000 + i * 40, 0, b"P.."));
        }

        let info = probe_over(store).info().await.expect("probe ok");
        assert_eq!(info.fps, 26);
    }

    #[tokio::test]
    async fn single_entry_log_probes_without_dividing_by_zero() {
        let store = Arc::new(MemoryLogStore::new("video"));
        store.push(frame_entry(5_000, 0, b"I.."));

        let info = probe_over(store).info().await.expect("probe ok");
        assert_eq!(info.start_timestamp, 5_000);
        assert_eq!(info.end_timestamp, 5_000);
        assert_eq!(info.duration, 0);
        assert_eq!(info.fps, 0);
    }

    #[tokio::test]
    async fn empty_log_probes_to_zeroes() {
        let store = Arc::new(MemoryLogStore::new("video"));
        let info = probe_over(store).info().await.expect("probe ok");
        assert_eq!(info, ProbeInfo::empty());
    }

    #[tokio::test]
    async fn probe_is_idempotent() {
        let store = Arc::new(MemoryLogStore::new("video"));
        for i in 0..10 {
            store.push(frame_entry(1_000 + i * 100, 0, b"P.."));
        }
        let probe = probe_over(store);
        let first = probe.info().await.expect("first probe");
        let second = probe.info().await.expect("second probe");
        assert_eq!(first, second);
    }
}
