//! Decoded frame representation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Codec-level classification of a decoded frame.
///
/// Only [`FrameKind::Independent`] frames (H.264 I-frames) are guaranteed to
/// be reconstructable without neighboring frames; the nearest-frame search
/// relies on this distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Standalone-decodable (I-frame).
    Independent,
    /// Depends on earlier frames (P-frame).
    Dependent,
    /// Bidirectionally predicted (B-frame).
    Predicted,
}

/// A single decoded video image.
///
/// Pixel data is in the decoder's fixed color layout (BGR24 for the stock
/// decoders), `width * height * 3` bytes, shared zero-copy via `Arc` so a
/// frame can be handed across tasks without duplicating the buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel buffer, row-major, fixed color layout.
    pub pixels: Arc<[u8]>,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Millisecond timestamp of the log entry this frame was decoded from.
    pub timestamp: i64,

    /// Codec frame classification.
    pub kind: FrameKind,
}

impl Frame {
    /// Create a new frame from an owned pixel buffer.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, timestamp: i64, kind: FrameKind) -> Self {
        Self { pixels: pixels.into(), width, height, timestamp, kind }
    }

    /// Whether this frame is standalone-decodable.
    pub fn is_independent(&self) -> bool {
        self.kind == FrameKind::Independent
    }
}
