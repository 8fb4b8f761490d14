//! Frame-level read access to video streams stored in a remote ordered log.
//!
//! Stillframe is the read side of a camera pipeline: an encoder elsewhere
//! publishes H.264 packets into an ordered log (Redis Streams in production),
//! keyed by millisecond timestamps, and this crate turns that log back into
//! decoded frames on demand.
//!
//! # Features
//!
//! - **Live tailing**: latest-frame polling and paced frame streams that skip
//!   ahead instead of queueing
//! - **History windows**: background-produced, bounded-queue replay of a
//!   `[from, to)` range with an idle-consumer timeout
//! - **Nearest-frame search**: find the independently-decodable frame closest
//!   to a target timestamp
//! - **Probing**: coverage window and frame-rate estimation without decoding
//!
//! The log store and the codec are both trait boundaries ([`LogStore`],
//! [`FrameDecoder`]); a Redis Streams backend ships behind the `redis` cargo
//! feature.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! // Requires the `redis` feature.
//! use std::sync::Arc;
//! use stillframe::{MediaStream, RedisLogStore, StreamConfig};
//! # use stillframe::DecoderFactory;
//!
//! # async fn run(h264_decoders: Arc<dyn DecoderFactory>) -> stillframe::Result<()> {
//! let store = RedisLogStore::connect("redis://camera-host/").await?;
//! let media = MediaStream::connect(store, h264_decoders, StreamConfig::default()).await?;
//!
//! if let Some(frame) = media.latest_live_frame().await? {
//!     println!("{}x{} @ {}", frame.width, frame.height, frame.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

// Core types and boundaries
pub mod config;
pub mod decode;
mod error;
pub mod store;
#[cfg(test)]
mod test_utils;
pub mod types;

// Retrieval engines
pub mod chunker;
pub mod history;
pub mod live;
pub mod media;
pub mod probe;
pub mod search;
pub mod stream;

// Core exports
pub use config::StreamConfig;
pub use decode::{DecodedImage, DecoderFactory, FrameDecoder};
pub use error::{Result, StreamError};
pub use store::{LogEntry, LogStore, ServerTime};
pub use types::{Cursor, EntryId, Frame, FrameKind, Packet};

// Engine exports
pub use chunker::Chunker;
pub use history::HistoryWindow;
pub use live::LiveCursor;
pub use media::MediaStream;
pub use probe::{ProbeInfo, StreamProbe};
pub use search::NearestFrameSearch;
pub use stream::{Pace, PaceExt};

#[cfg(feature = "redis")]
pub use store::RedisLogStore;
