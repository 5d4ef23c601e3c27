//! # streamchat-core
//!
//! Core types and the conversation state machine for streamchat.
//!
//! - **Messages**: [`Message`] and [`Role`]
//! - **Events**: [`StreamEvent`], the records a streamed response carries
//! - **Identity**: [`RequestIdentity`], used to reject updates from superseded requests
//! - **Conversation**: [`ConversationState`], which folds events into messages
//!
//! ## Example
//!
//! ```rust
//! use streamchat_core::{ConversationState, Message, StreamEvent};
//!
//! let mut state = ConversationState::new();
//! state.append_user("hi");
//! state.apply_event(&StreamEvent::status("thinking"));
//! state.apply_event(&StreamEvent::response("H"));
//! state.apply_event(&StreamEvent::response("He"));
//!
//! assert_eq!(state.messages(), &[Message::user("hi"), Message::ai("He")]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod conversation;
pub mod event;
pub mod identifier;
pub mod messages;

pub use conversation::{reduce, ConversationState};
pub use event::{ContentMode, StreamEvent};
pub use identifier::{IdentitySequence, RequestIdentity};
pub use messages::{Message, Role};
