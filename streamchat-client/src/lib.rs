//! # streamchat-client
//!
//! Request lifecycle for a streamed chat conversation.
//!
//! ## Core Concepts
//!
//! - **[`ChatController`]**: owns the conversation and one live request;
//!   supersedes on send, cancels on clear, turns failures into a message
//! - **[`ChatTransport`]**: the network seam; [`HttpTransport`] is the reqwest implementation
//! - **[`ClientConfig`]**: endpoint, timeouts, failure notice, content mode
//!
//! ## Example
//!
//! ```ignore
//! use streamchat_client::{ChatController, ClientConfig, HttpTransport};
//!
//! let config = ClientConfig::from_env()?;
//! let transport = HttpTransport::new(&config)?;
//! let mut chat = ChatController::new(transport, config);
//!
//! chat.send("hi");
//! chat.run_until_idle().await;
//!
//! for message in chat.messages() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod transport;

pub use config::ClientConfig;
pub use controller::{
    ChatController, ChatSnapshot, RequestPhase, RequestUpdate, TaggedUpdate, UpdateOutcome,
};
pub use error::{ClientError, ClientResult, ConfigError};
pub use transport::{ChatTransport, HttpTransport};
