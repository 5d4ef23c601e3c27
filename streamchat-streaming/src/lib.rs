//! # streamchat-streaming
//!
//! Turns a chunked chat response body into a stream of [`StreamEvent`]s.
//!
//! ## Core Concepts
//!
//! - **[`TextChunks`]**: decode a byte stream into text fragments, honouring cancellation
//! - **[`NdjsonFramer`]**: split fragments into newline-delimited records and parse them
//! - **[`EventStream`]**: the framer as an async stream adapter
//! - **[`TransportError`]**: connection failures and cancellation, kept apart by
//!   [`TransportError::is_cancellation`]
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use streamchat_streaming::{ndjson_events, DEFAULT_MAX_RECORD_BYTES};
//!
//! let mut events = ndjson_events(body, cancel_token, DEFAULT_MAX_RECORD_BYTES);
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! ```
//!
//! [`StreamEvent`]: streamchat_core::StreamEvent

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod framer;
pub mod transport;

pub use error::{ParseError, StreamResult, TransportError, RECORD_PREVIEW_CHARS};
pub use framer::{ndjson_events, parse_record, EventStream, NdjsonFramer, DEFAULT_MAX_RECORD_BYTES};
pub use transport::{ByteStream, TextChunks, Utf8Decoder};
