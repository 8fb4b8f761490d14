//! Live tailing of the newest packets in the log.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::chunker::Chunker;
use crate::config::StreamConfig;
use crate::error::Result;
use crate::store::LogStore;
use crate::types::{Cursor, Frame};

/// Incrementally tails the log and decodes only the newest packets.
///
/// The cursor is a monotonic read position: each poll reads everything
/// strictly after it, advances it to the last entry seen, and returns only
/// the most recent decoded frame. Earlier frames in the same batch are
/// discarded; this is a skip-ahead consumer, not a FIFO. A cursor that has
/// drifted further behind the server clock than the rewind window is
/// resynchronized to "the last rewind window" instead of replaying the
/// backlog.
pub struct LiveCursor<S> {
    store: Arc<S>,
    stream: String,
    chunker: Chunker,
    cursor: Option<Cursor>,
    rewind_ms: i64,
    block_ms: u64,
}

impl<S: LogStore> LiveCursor<S> {
    /// Create a cursor in the uninitialized state; the first poll
    /// resynchronizes it.
    pub fn new(store: Arc<S>, config: &StreamConfig, chunker: Chunker) -> Self {
        Self {
            store,
            stream: config.stream.clone(),
            chunker,
            cursor: None,
            rewind_ms: config.live_rewind_ms as i64,
            block_ms: config.read_block_ms,
        }
    }

    /// Read everything newer than the cursor and return the latest frame.
    ///
    /// Returns `Ok(None)` when the bounded tail read yields nothing; that is
    /// a valid empty result, not a failure. Store errors propagate; the
    /// caller is expected to retry.
    pub async fn poll(&mut self) -> Result<Option<Frame>> {
        let now_ms = self.store.server_time().await?.to_millis();

        let cursor = match self.cursor.take() {
            Some(cursor) if (now_ms - cursor.timestamp_ms()).abs() <= self.rewind_ms => cursor,
            _ => {
                let resync_ms = now_ms - self.rewind_ms;
                debug!(resync_ms, "live cursor cold or stale, resynchronizing");
                Cursor::from_timestamp(resync_ms)
            }
        };
        let from = cursor.id().to_string();
        self.cursor = Some(cursor);

        let batch = self.store.read_from(&self.stream, &from, self.block_ms, None).await?;
        let Some(last) = batch.last() else {
            trace!("no new entries within block window");
            return Ok(None);
        };

        // Advance past everything read, even if none of it decodes; the next
        // poll must never re-deliver these entries.
        self.cursor = Some(Cursor::from_entry_id(&last.id)?);

        let frames = self.chunker.frames(&batch);
        let newest = frames.into_values().next_back();
        if let Some(frame) = &newest {
            trace!(timestamp = frame.timestamp, entries = batch.len(), "live frame decoded");
        }
        Ok(newest)
    }
}
