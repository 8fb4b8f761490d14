//! Nearest-timestamp frame search for screenshot retrieval.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::chunker::Chunker;
use crate::config::StreamConfig;
use crate::decode::DecoderFactory;
use crate::error::Result;
use crate::store::LogStore;
use crate::types::Frame;

/// How close to "now" a target must be before the search stops looking ahead
/// of it.
const LIVE_EDGE_SLACK_MS: i64 = 10;

/// Finds the independently-decodable frame closest to a target timestamp.
///
/// GOP structures place independent frames sparsely, so an exact hit is not
/// guaranteed: the search scans backward one second at a time within the
/// radius; unless the target is at the live edge, the scan window extends
/// half the radius ahead of the target, since the nearest candidate may lie
/// slightly in the future.
///
/// The scan stops at the first one-second window containing any independent
/// frame and returns the best candidate from that window. This is a
/// first-hit-wins policy inherited from the protocol: a window further back
/// could in principle hold a closer candidate, but is never examined once a
/// hit exists.
pub struct NearestFrameSearch<S> {
    store: Arc<S>,
    decoders: Arc<dyn DecoderFactory>,
    stream: String,
    window_read_count: usize,
}

impl<S: LogStore> NearestFrameSearch<S> {
    pub fn new(store: Arc<S>, decoders: Arc<dyn DecoderFactory>, config: &StreamConfig) -> Self {
        Self {
            store,
            decoders,
            stream: config.stream.clone(),
            window_read_count: config.probe_sample,
        }
    }

    /// Search for the independent frame nearest `target_ms`, scanning at most
    /// `radius_seconds` one-second windows backward.
    ///
    /// Returns `Ok(None)` when no independent frame exists within the radius.
    pub async fn find(&self, target_ms: i64, radius_seconds: u32) -> Result<Option<Frame>> {
        let now_ms = self.store.server_time().await?.to_millis();

        // At the live edge there is nothing ahead of the target to look at;
        // otherwise search half the radius into the future as well.
        let mut upper = if (now_ms - target_ms).abs() <= LIVE_EDGE_SLACK_MS {
            target_ms
        } else {
            target_ms + i64::from(radius_seconds) * 1000 / 2
        }
        .max(0);

        // Fresh decoder per search; candidate windows are decoded standalone.
        let mut chunker = Chunker::new(self.decoders.create()?);

        for step in 0..radius_seconds {
            // Entry timestamps are never negative; a window clamped at the
            // epoch must not produce a bound the store rejects.
            let lower = (upper - 1000).max(0);
            trace!(lower, upper, step, "scanning window for independent frame");
            let batch = self
                .store
                .read_range(
                    &self.stream,
                    &lower.to_string(),
                    &upper.to_string(),
                    self.window_read_count,
                )
                .await?;

            let mut best: Option<Frame> = None;
            for frame in chunker.frames(&batch).into_values() {
                if !frame.is_independent() {
                    continue;
                }
                let closer = match &best {
                    Some(current) => {
                        (frame.timestamp - target_ms).abs() < (current.timestamp - target_ms).abs()
                    }
                    None => true,
                };
                if closer {
                    best = Some(frame);
                }
            }

            if let Some(frame) = best {
                debug!(
                    timestamp = frame.timestamp,
                    target_ms, step, "nearest independent frame found"
                );
                return Ok(Some(frame));
            }

            if lower == 0 {
                break;
            }
            upper = lower;
        }

        debug!(target_ms, radius_seconds, "no independent frame within radius");
        Ok(None)
    }
}
