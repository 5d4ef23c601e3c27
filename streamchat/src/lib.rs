//! # streamchat
//!
//! A chat client core that renders a backend's answer as it streams in.
//!
//! The backend answers `POST {"query": ...}` with a chunked body of
//! newline-delimited JSON records:
//!
//! ```text
//! {"type":"status","content":"thinking"}
//! {"type":"response","content":"H"}
//! {"type":"response","content":"He"}
//! ```
//!
//! `status` records update an ephemeral progress line; `response` records
//! carry the assistant message so far. The controller folds them into a
//! conversation, keeps at most one request alive, and ignores anything a
//! superseded request still delivers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use streamchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut chat = streamchat::direct::connect_from_env()?;
//!     chat.send("hi");
//!     chat.run_until_idle().await;
//!
//!     for message in chat.messages() {
//!         println!("{}: {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`streamchat_core`] - Messages, events, and the conversation state machine
//! - [`streamchat_streaming`] - Body decoding and event framing
//! - [`streamchat_client`] - Request controller, transports, configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod direct;

/// Messages, events, and the conversation state machine.
pub use streamchat_core as core;

/// Body decoding and event framing.
pub use streamchat_streaming as streaming;

/// Request controller, transports, configuration.
pub use streamchat_client as client;

pub use streamchat_client::{
    ChatController, ChatSnapshot, ChatTransport, ClientConfig, ClientError, ConfigError,
    HttpTransport, RequestPhase,
};
pub use streamchat_core::{ContentMode, ConversationState, Message, RequestIdentity, Role, StreamEvent};
pub use streamchat_streaming::TransportError;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ChatController, ChatSnapshot, ClientConfig, ContentMode, HttpTransport, Message,
        RequestPhase, Role, StreamEvent,
    };
}
