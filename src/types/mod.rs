//! Core types for frame retrieval.
//!
//! - [`Frame`] is a single decoded image, the unit every public operation
//!   returns.
//! - [`Packet`] is one encoded payload read from the log, consumed exactly
//!   once by the decoder.
//! - [`EntryId`] and [`Cursor`] model positions in the ordered log. A cursor
//!   obtained from one read is only ever used as the *exclusive* lower bound
//!   of the next read, so tailing never re-delivers an entry.

mod entry;
mod frame;

pub use entry::{Cursor, EntryId, Packet};
pub use frame::{Frame, FrameKind};
