//! Historical-window retrieval: a background producer fills a bounded queue
//! that the caller drains one frame at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::chunker::Chunker;
use crate::config::StreamConfig;
use crate::decode::DecoderFactory;
use crate::error::{Result, StreamError};
use crate::store::LogStore;
use crate::types::{Cursor, Frame};

/// One active historical-range session.
///
/// The receiver sits behind its own lock so a caller can block on the queue
/// without holding the session guard; channel closure is the end-of-range
/// signal.
struct Session {
    frames: Arc<Mutex<mpsc::Receiver<Frame>>>,
    cancel: CancellationToken,
    last_pull_ms: i64,
    stopped: bool,
}

/// Retrieval engine for a `[from_ts, to_ts)` range of the log.
///
/// At most one session is active per instance. [`HistoryWindow::next_frame`]
/// starts the session on first call and drains it on subsequent calls; the
/// background producer stays at most `history_capacity` frames ahead of the
/// consumer. A caller that goes quiet for longer than the idle timeout loses
/// the session and gets [`StreamError::InfrequentAccess`] on its next pull;
/// buffered state is discarded to bound memory and staleness.
pub struct HistoryWindow<S> {
    store: Arc<S>,
    decoders: Arc<dyn DecoderFactory>,
    config: StreamConfig,
    session: Mutex<Option<Session>>,
}

impl<S: LogStore> HistoryWindow<S> {
    pub fn new(store: Arc<S>, decoders: Arc<dyn DecoderFactory>, config: StreamConfig) -> Self {
        Self { store, decoders, config, session: Mutex::new(None) }
    }

    /// Pull the next frame of the range, starting the session if needed.
    ///
    /// Returns `Ok(None)` exactly once when the range is exhausted or the
    /// session was stopped; the session is cleaned up at that point and the
    /// next call starts a fresh one. Calling again more than the idle timeout
    /// after the previous pull fails with
    /// [`StreamError::InfrequentAccess`].
    pub async fn next_frame(&self, from_ts: i64, to_ts: i64) -> Result<Option<Frame>> {
        let now_ms = self.store.server_time().await?.to_millis();

        // Session bookkeeping under the guard; the queue wait happens after
        // it is released.
        let frames = {
            let mut guard = self.session.lock().await;
            match guard.as_mut() {
                Some(session) if session.stopped => {
                    guard.take();
                    debug!("stopped history session drained");
                    return Ok(None);
                }
                Some(session) => {
                    let idle_ms = (now_ms - session.last_pull_ms).unsigned_abs();
                    if idle_ms > self.config.history_idle_timeout_ms {
                        session.cancel.cancel();
                        guard.take();
                        warn!(idle_ms, "history consumer too infrequent, discarding session");
                        return Err(StreamError::InfrequentAccess {
                            idle: Duration::from_millis(idle_ms),
                        });
                    }
                    session.last_pull_ms = now_ms;
                    Arc::clone(&session.frames)
                }
                None => {
                    let session = self.start_session(from_ts, to_ts, now_ms)?;
                    let frames = Arc::clone(&session.frames);
                    *guard = Some(session);
                    frames
                }
            }
        };

        let next = frames.lock().await.recv().await;
        match next {
            Some(frame) => {
                trace!(timestamp = frame.timestamp, "history frame delivered");
                Ok(Some(frame))
            }
            None => {
                // Producer closed the queue: natural end of range, or it gave
                // up after repeated store failures.
                let mut guard = self.session.lock().await;
                if let Some(session) = guard.take() {
                    session.cancel.cancel();
                }
                debug!("history range exhausted");
                Ok(None)
            }
        }
    }

    /// Stop the active session before its natural end.
    ///
    /// Cooperative: the producer observes the cancellation on its next
    /// iteration, and the caller's next pull yields one final `None` instead
    /// of the remaining range.
    pub async fn stop(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            session.cancel.cancel();
            session.stopped = true;
            debug!("history session stop requested");
        }
    }

    fn start_session(&self, from_ts: i64, to_ts: i64, now_ms: i64) -> Result<Session> {
        let decoder = self.decoders.create()?;
        let (tx, rx) = mpsc::channel(self.config.history_capacity);
        let cancel = CancellationToken::new();

        info!(from_ts, to_ts, "starting history session");
        tokio::spawn(produce(
            Arc::clone(&self.store),
            self.config.stream.clone(),
            Chunker::new(decoder),
            from_ts,
            to_ts,
            tx,
            cancel.clone(),
            self.config.clone(),
        ));

        Ok(Session {
            frames: Arc::new(Mutex::new(rx)),
            cancel,
            last_pull_ms: now_ms,
            stopped: false,
        })
    }
}

/// Background producer: read the range incrementally, decode, push into the
/// bounded queue.
///
/// The queue's capacity is the sole backpressure mechanism; `send` waits when
/// the consumer falls behind. Dropping the sender closes the queue, which is
/// the only termination signal the consumer sees: natural exhaustion,
/// cancellation, and giving up after repeated store failures all end here.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn produce<S: LogStore>(
    store: Arc<S>,
    stream: String,
    mut chunker: Chunker,
    from_ts: i64,
    to_ts: i64,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    config: StreamConfig,
) {
    let mut cursor = Cursor::from_timestamp(from_ts);
    let mut retries = 0u32;

    while cursor.timestamp_ms() < to_ts {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("history producer cancelled");
                return;
            }
            _ = tx.closed() => {
                debug!("history consumer dropped, ending producer");
                return;
            }
            read = store.read_from(
                &stream,
                cursor.id(),
                config.read_block_ms,
                Some(config.history_batch),
            ) => read,
        };

        match read {
            Ok(entries) => {
                let Some(last) = entries.last() else {
                    // The store already blocked for the read window; nothing
                    // new yet, keep tailing toward the cutoff.
                    trace!(cursor = cursor.id(), "history read returned no entries");
                    continue;
                };
                retries = 0;
                cursor = match Cursor::from_entry_id(&last.id) {
                    Ok(cursor) => cursor,
                    Err(e) => {
                        warn!(id = %last.id, error = %e, "unparseable entry id, ending session");
                        break;
                    }
                };

                for frame in chunker.frames(&entries).into_values() {
                    if frame.timestamp >= to_ts {
                        continue;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("history producer cancelled mid-batch");
                            return;
                        }
                        sent = tx.send(frame) => {
                            if sent.is_err() {
                                debug!("history consumer dropped, ending producer");
                                return;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                retries += 1;
                warn!(error = %e, retries, "history read failed");
                if retries >= config.history_max_retries {
                    warn!("too many store failures, closing history queue");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50 * (1 << retries.min(5)))).await;
            }
        }
    }

    debug!(to_ts, "history producer finished");
    // Dropping `tx` here closes the queue.
}
