//! Public facade over the retrieval engines.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunker::Chunker;
use crate::config::StreamConfig;
use crate::decode::DecoderFactory;
use crate::error::{Result, StreamError};
use crate::history::{self, HistoryWindow};
use crate::live::LiveCursor;
use crate::probe::{ProbeInfo, StreamProbe};
use crate::search::NearestFrameSearch;
use crate::store::LogStore;
use crate::stream::PaceExt;
use crate::types::Frame;

/// Consecutive poll failures tolerated by [`MediaStream::live_frames`] before
/// the stream ends.
const MAX_POLL_ERRORS: u32 = 10;

/// Frame-level read access to one video stream in the ordered log.
///
/// Construction takes every collaborator explicitly: the log store, a
/// decoder factory, and the [`StreamConfig`]. All state is in memory and
/// rebuilt from the log on demand; dropping the instance loses nothing that
/// cannot be re-derived.
///
/// All operations are safe to call from `&self`; the live cursor and the
/// history session serialize internally.
pub struct MediaStream<S: LogStore> {
    store: Arc<S>,
    decoders: Arc<dyn DecoderFactory>,
    config: StreamConfig,
    live: Mutex<LiveCursor<S>>,
    history: HistoryWindow<S>,
    search: NearestFrameSearch<S>,
    probe: StreamProbe<S>,
}

impl<S: LogStore> MediaStream<S> {
    /// Connect to the log store and set up the retrieval engines.
    ///
    /// Performs one server-time round trip so an unreachable or
    /// unauthenticated store fails here, immediately, rather than on the
    /// first retrieval.
    pub async fn connect(
        store: S,
        decoders: Arc<dyn DecoderFactory>,
        config: StreamConfig,
    ) -> Result<Self> {
        let store = Arc::new(store);

        let time = match store.server_time().await {
            Ok(time) => time,
            Err(e) => {
                return Err(StreamError::connection_failed_with_source(
                    "log store did not answer the initial time query",
                    Box::new(e),
                ));
            }
        };
        info!(stream = %config.stream, server_seconds = time.seconds, "connected to log store");

        let live = Mutex::new(LiveCursor::new(
            Arc::clone(&store),
            &config,
            Chunker::new(decoders.create()?),
        ));
        let history = HistoryWindow::new(Arc::clone(&store), Arc::clone(&decoders), config.clone());
        let search = NearestFrameSearch::new(Arc::clone(&store), Arc::clone(&decoders), &config);
        let probe = StreamProbe::new(Arc::clone(&store), &config);

        Ok(Self { store, decoders, config, live, history, search, probe })
    }

    /// The latest frame of the live stream, or `None` when nothing new
    /// arrived within the read window.
    pub async fn latest_live_frame(&self) -> Result<Option<Frame>> {
        self.live.lock().await.poll().await
    }

    /// The next frame of the historical range `[from_ts, to_ts)`.
    ///
    /// Repeatable: the first call starts the range, subsequent calls drain
    /// it, and `None` marks exhaustion. Callers must keep pulling at least
    /// every 10 seconds (configurable) or the session is discarded and the
    /// next call fails with [`StreamError::InfrequentAccess`].
    pub async fn historical_frame(&self, from_ts: i64, to_ts: i64) -> Result<Option<Frame>> {
        self.history.next_frame(from_ts, to_ts).await
    }

    /// Stop the active historical range before its natural end.
    ///
    /// The next [`MediaStream::historical_frame`] call yields one final
    /// `None`.
    pub async fn cancel_historical(&self) {
        self.history.stop().await;
    }

    /// The independently-decodable frame nearest `target_ms`, searching up to
    /// `radius_seconds` backward (and half of that forward of the target).
    pub async fn nearest_frame(&self, target_ms: i64, radius_seconds: u32) -> Result<Option<Frame>> {
        self.search.find(target_ms, radius_seconds).await
    }

    /// Estimated coverage window and frame rate of the log.
    pub async fn probe(&self) -> Result<ProbeInfo> {
        self.probe.info().await
    }

    /// An endless stream of live frames with its own cursor.
    ///
    /// `max_hz` caps delivery with skip-ahead pacing; `None` delivers every
    /// frame the poll loop produces. Transient store failures are retried
    /// with backoff; the stream ends only after repeated consecutive
    /// failures.
    pub fn live_frames(&self, max_hz: Option<u32>) -> Result<BoxStream<'static, Frame>> {
        let cursor = LiveCursor::new(
            Arc::clone(&self.store),
            &self.config,
            Chunker::new(self.decoders.create()?),
        );

        let raw = futures::stream::unfold((cursor, 0u32), |(mut cursor, mut errors)| async move {
            loop {
                match cursor.poll().await {
                    Ok(Some(frame)) => return Some((frame, (cursor, 0))),
                    Ok(None) => {
                        // Quiet read window; the store already blocked for it.
                        errors = 0;
                    }
                    Err(e) => {
                        errors += 1;
                        warn!(error = %e, errors, "live poll failed");
                        if errors >= MAX_POLL_ERRORS {
                            warn!("too many live poll failures, ending frame stream");
                            return None;
                        }
                        tokio::time::sleep(Duration::from_millis(50 * (1 << errors.min(5))))
                            .await;
                    }
                }
            }
        });

        Ok(match max_hz {
            Some(hz) if hz > 0 => {
                raw.pace(Duration::from_secs_f64(1.0 / f64::from(hz))).boxed()
            }
            _ => raw.boxed(),
        })
    }

    /// The historical range `[from_ts, to_ts)` as a stream.
    ///
    /// Unlike [`MediaStream::historical_frame`] there is no pull-frequency
    /// protocol: the bounded channel throttles the producer, and dropping the
    /// stream stops it.
    pub fn history_frames(&self, from_ts: i64, to_ts: i64) -> Result<ReceiverStream<Frame>> {
        let decoder = self.decoders.create()?;
        let (tx, rx) = mpsc::channel(self.config.history_capacity);

        info!(from_ts, to_ts, "starting history frame stream");
        tokio::spawn(history::produce(
            Arc::clone(&self.store),
            self.config.stream.clone(),
            Chunker::new(decoder),
            from_ts,
            to_ts,
            tx,
            CancellationToken::new(),
            self.config.clone(),
        ));

        Ok(ReceiverStream::new(rx))
    }
}
