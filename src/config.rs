//! Stream configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`MediaStream`](crate::MediaStream).
///
/// Every timing and sizing knob of the retrieval engine lives here and is
/// passed in at construction. The defaults match the upstream encoder's
/// publishing cadence and are what production deployments run with; tests
/// shrink them to keep wall-clock time down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Key of the ordered-log stream holding the encoded video packets.
    pub stream: String,

    /// How far behind the server clock the live cursor may drift before it
    /// resynchronizes to `now - live_rewind_ms` instead of replaying the
    /// backlog.
    pub live_rewind_ms: u64,

    /// Upper bound on a single blocking tail read against the log store.
    pub read_block_ms: u64,

    /// Capacity of the history session's frame queue. This is the sole
    /// backpressure mechanism between the producer task and the consumer.
    pub history_capacity: usize,

    /// Entry count per producer read while filling a history window.
    pub history_batch: usize,

    /// Maximum gap between two history pulls before the session is presumed
    /// abandoned and torn down.
    pub history_idle_timeout_ms: u64,

    /// How many consecutive store failures the history producer tolerates
    /// before it gives up and closes the queue.
    pub history_max_retries: u32,

    /// Entry count for the probe's forward sample (also the per-window read
    /// size of the nearest-frame search).
    pub probe_sample: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream: "video".to_string(),
            live_rewind_ms: 30_000,
            read_block_ms: 1_000,
            history_capacity: 10,
            history_batch: 10,
            history_idle_timeout_ms: 10_000,
            history_max_retries: 3,
            probe_sample: 60,
        }
    }
}

impl StreamConfig {
    /// Configuration for the named stream, all other knobs at defaults.
    pub fn for_stream(stream: impl Into<String>) -> Self {
        Self { stream: stream.into(), ..Self::default() }
    }
}
