//! Boundary with the packet decoder.
//!
//! Decoding is owned by a native codec library outside this crate; the core
//! depends on it only through [`FrameDecoder`]. Decoders are stateful (an
//! H.264 decoder accumulates parameter sets and reference frames), so each
//! retrieval context gets its own instance from a [`DecoderFactory`] rather
//! than sharing a hidden global: the live cursor keeps one for its lifetime,
//! every history session and every nearest-frame search starts fresh.

use crate::error::Result;
use crate::types::FrameKind;

/// One image produced by the decoder, not yet stamped with a log timestamp.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel buffer in the decoder's fixed color layout.
    pub pixels: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Codec frame classification.
    pub kind: FrameKind,
}

/// Turns opaque encoded payloads into images.
///
/// A single payload may yield zero images (a slice of a multi-packet frame
/// that is not complete yet), one, or several. Errors from `decode` are local
/// and recoverable: batch decoding skips the offending packet and keeps
/// going.
pub trait FrameDecoder: Send {
    /// Feed one encoded payload to the decoder.
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedImage>>;
}

/// Creates decoder instances on demand.
///
/// Injected at [`MediaStream`](crate::MediaStream) construction so the codec
/// choice is explicit configuration instead of process-wide shared state.
pub trait DecoderFactory: Send + Sync + 'static {
    /// Create a fresh decoder with no accumulated state.
    fn create(&self) -> Result<Box<dyn FrameDecoder + Send>>;
}
