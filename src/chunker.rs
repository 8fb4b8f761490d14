//! Splits raw log batches into packets and decodes them into frames.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::decode::FrameDecoder;
use crate::store::{FRAME_FIELD, LogEntry};
use crate::types::{EntryId, Frame, Packet};

/// Turns a batch of log entries into timestamped packets or decoded frames.
///
/// Owns the decoder for one retrieval context. The maps it returns iterate in
/// ascending timestamp order; when two entries share a millisecond the later
/// one wins, which matches the log's entry-id tie-breaking for a
/// latest-interested consumer.
pub struct Chunker {
    decoder: Box<dyn FrameDecoder + Send>,
}

impl Chunker {
    /// Create a chunker around a decoder instance.
    pub fn new(decoder: Box<dyn FrameDecoder + Send>) -> Self {
        Self { decoder }
    }

    /// Split a raw batch into timestamp-keyed packets without decoding.
    ///
    /// Entries with a malformed id or without a `frame` field are dropped.
    pub fn packets(batch: &[LogEntry]) -> BTreeMap<i64, Packet> {
        let mut packets = BTreeMap::new();
        for entry in batch {
            let id: EntryId = match entry.id.parse() {
                Ok(id) => id,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "skipping entry with malformed id");
                    continue;
                }
            };
            let Some(payload) = entry.field(FRAME_FIELD) else {
                trace!(id = %entry.id, "skipping entry without frame payload");
                continue;
            };
            packets.insert(
                id.timestamp_ms,
                Packet { timestamp: id.timestamp_ms, payload: payload.to_vec() },
            );
        }
        packets
    }

    /// Decode a raw batch into timestamp-keyed frames.
    ///
    /// Packets are fed to the decoder in ascending timestamp order. A packet
    /// that fails to decode is skipped; one bad payload never aborts the rest
    /// of the batch. A packet may also legitimately yield no frame at all
    /// when it belongs to a frame the decoder has not seen the whole of yet.
    pub fn frames(&mut self, batch: &[LogEntry]) -> BTreeMap<i64, Frame> {
        let mut frames = BTreeMap::new();
        for (timestamp, packet) in Self::packets(batch) {
            match self.decoder.decode(&packet.payload) {
                Ok(images) => {
                    for image in images {
                        frames.insert(
                            timestamp,
                            Frame {
                                pixels: image.pixels.into(),
                                width: image.width,
                                height: image.height,
                                timestamp,
                                kind: image.kind,
                            },
                        );
                    }
                }
                Err(e) => {
                    debug!(timestamp, error = %e, "packet decode failed, skipping");
                }
            }
        }
        frames
    }
}
