//! Streaming errors.

use thiserror::Error;

/// Connection-level failures while opening or reading a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Timed out connecting or reading.
    #[error("Timeout")]
    Timeout,

    /// The request was cancelled by its owner.
    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check if this is a cancellation rather than a genuine failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A single stream record that could not be turned into an event.
///
/// These never leave the framer; they are logged and the record is skipped.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The record is not a valid event object.
    #[error("Invalid event record of {len} bytes {record:?}: {source}")]
    Json {
        /// Leading part of the offending record, at most [`RECORD_PREVIEW_CHARS`] chars.
        record: String,
        /// Full record length in bytes.
        len: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A partial record grew past the buffer limit without a newline.
    #[error("Partial record of {len} bytes exceeds limit of {limit} bytes")]
    Oversized {
        /// Bytes buffered.
        len: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl ParseError {
    /// Build a JSON error, keeping only a short preview of `record`.
    pub fn json(record: &str, source: serde_json::Error) -> Self {
        Self::Json {
            record: preview(record),
            len: record.len(),
            source,
        }
    }
}

/// Longest record excerpt kept in a [`ParseError::Json`].
pub const RECORD_PREVIEW_CHARS: usize = 128;

fn preview(record: &str) -> String {
    match record.char_indices().nth(RECORD_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &record[..cut]),
        None => record.to_string(),
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, TransportError>;
