//! Error types for frame retrieval.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The important split is between failures of the log store (I/O,
//! usually worth retrying), failures of the decoder (always local, usually
//! skipped), and the signaled [`StreamError::InfrequentAccess`] condition of
//! the history protocol, which callers recover from by starting a fresh
//! range.
//!
//! "No data yet" is never an error anywhere in this crate: every operation
//! that can come up empty returns `Ok(None)`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for frame retrieval operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for frame retrieval operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    /// Could not reach or authenticate to the log store. Fatal at startup.
    #[error("failed to connect to log store: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O failure while reading from the log store.
    #[error("log store read failed during {operation}")]
    Store {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A packet or frame could not be decoded.
    ///
    /// Batch decoding skips these internally; this surfaces only from
    /// decoder construction or when a caller invokes a decoder directly.
    #[error("decode failed: {details}")]
    Decode { details: String },

    /// Malformed data from the log store, e.g. an entry id that does not
    /// follow the `<timestamp_ms>-<sequence>` format.
    #[error("parse error in {context}: {details}")]
    Parse { context: String, details: String },

    /// The history consumer went quiet for longer than the session allows.
    ///
    /// The session has been torn down; restart with a fresh range.
    #[error("history session idle for {idle:?}, session discarded")]
    InfrequentAccess { idle: Duration },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// `InfrequentAccess` counts as retryable because the caller can start a
    /// new history session immediately. Connection failures at startup are
    /// deliberately not retried by this crate.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Connection { .. } => false,
            StreamError::Store { .. } => true,
            StreamError::Decode { .. } => false,
            StreamError::Parse { .. } => false,
            StreamError::InfrequentAccess { .. } => true,
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        StreamError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for log store read errors.
    pub fn store_error(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StreamError::Store { operation: operation.into(), source: Box::new(source) }
    }

    /// Helper constructor for decode errors.
    pub fn decode_failed(details: impl Into<String>) -> Self {
        StreamError::Decode { details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Parse { context: context.into(), details: details.into() }
    }
}
