//! Conversation state machine.
//!
//! [`ConversationState`] owns the ordered message list and tracks which
//! assistant message, if any, is still open for streamed updates. Events are
//! folded in with [`ConversationState::apply_event`] or the by-value
//! [`reduce`] function.

use crate::event::{ContentMode, StreamEvent};
use crate::messages::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Messages plus the open assistant message pointer and progress text.
///
/// When `open_ai_index` is set it refers to the last message, and that
/// message has role [`Role::Ai`]. Every mutation driven by an event
/// re-checks this before touching the message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    open_ai_index: Option<usize>,
    progress_text: Option<String>,
    #[serde(default)]
    content_mode: ContentMode,
}

impl ConversationState {
    /// Create an empty conversation with cumulative reconciliation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how `response` events are reconciled.
    #[must_use]
    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = mode;
        self
    }

    /// All messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current progress text, if any.
    pub fn progress_text(&self) -> Option<&str> {
        self.progress_text.as_deref()
    }

    /// Index of the open assistant message, if any.
    pub fn open_ai_index(&self) -> Option<usize> {
        self.open_ai_index
    }

    /// The reconciliation mode in use.
    pub fn content_mode(&self) -> ContentMode {
        self.content_mode
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user message. Closes any open assistant message.
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
        self.open_ai_index = None;
    }

    /// Append an assistant message that will never receive updates.
    ///
    /// Used for synthetic messages such as transport failure notices.
    pub fn append_closed_ai(&mut self, text: impl Into<String>) {
        self.messages.push(Message::ai(text));
        self.open_ai_index = None;
    }

    /// Fold one stream event into the state.
    pub fn apply_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Status { content } => {
                self.progress_text = Some(content.clone());
            }
            StreamEvent::Response { content } => self.apply_response(content),
        }
    }

    fn apply_response(&mut self, content: &str) {
        match self.valid_open_index() {
            Some(index) => {
                let message = &mut self.messages[index];
                match self.content_mode {
                    ContentMode::Cumulative => {
                        message.content.clear();
                        message.content.push_str(content);
                    }
                    ContentMode::Delta => message.content.push_str(content),
                }
            }
            None => {
                self.messages.push(Message::ai(content));
                self.open_ai_index = Some(self.messages.len() - 1);
            }
        }
    }

    /// Return the open index only if it still points at a trailing AI message.
    fn valid_open_index(&mut self) -> Option<usize> {
        let index = self.open_ai_index?;
        let is_trailing_ai = self.messages.len().checked_sub(1) == Some(index)
            && self.messages.get(index).map(|m| m.role) == Some(Role::Ai);

        if is_trailing_ai {
            Some(index)
        } else {
            debug!(index, len = self.messages.len(), "Dropping stale open message pointer");
            self.open_ai_index = None;
            None
        }
    }

    /// Close the open assistant message without appending anything.
    pub fn close_open_message(&mut self) {
        self.open_ai_index = None;
    }

    /// Clear the progress text.
    pub fn clear_progress(&mut self) {
        self.progress_text = None;
    }

    /// Reset to an empty conversation. The content mode is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.open_ai_index = None;
        self.progress_text = None;
    }
}

/// Pure reducer form of [`ConversationState::apply_event`].
#[must_use]
pub fn reduce(mut state: ConversationState, event: &StreamEvent) -> ConversationState {
    state.apply_event(event);
    state
}
