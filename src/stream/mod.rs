//! Stream adapters for continuous frame delivery.

mod pace;

pub use pace::{Pace, PaceExt};
