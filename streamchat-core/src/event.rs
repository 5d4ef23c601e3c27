//! Events carried by a streamed chat response.

use serde::{Deserialize, Serialize};

/// One parsed record from the backend's response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Ephemeral progress text. Never stored in the conversation.
    Status {
        /// Progress text to display while the request is in flight.
        content: String,
    },
    /// Content of the current assistant message.
    Response {
        /// Full-so-far content, or a fragment in [`ContentMode::Delta`].
        content: String,
    },
}

impl StreamEvent {
    /// Create a status event.
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
        }
    }

    /// Create a response event.
    pub fn response(content: impl Into<String>) -> Self {
        Self::Response {
            content: content.into(),
        }
    }

    /// Wire name of the event type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Response { .. } => "response",
        }
    }

    /// Text payload of the event.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            StreamEvent::Status { content } | StreamEvent::Response { content } => content,
        }
    }
}

/// How `response` events are reconciled with the open assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Each event carries the full accumulated content; replace.
    #[default]
    Cumulative,
    /// Each event carries only new text; append.
    Delta,
}

impl ContentMode {
    /// Parse from a case-insensitive name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cumulative" => Some(ContentMode::Cumulative),
            "delta" => Some(ContentMode::Delta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"status","content":"thinking"}"#).unwrap();
        assert_eq!(event, StreamEvent::status("thinking"));
        assert_eq!(event.kind(), "status");

        let json = serde_json::to_string(&StreamEvent::response("He")).unwrap();
        assert_eq!(json, r#"{"type":"response","content":"He"}"#);
    }

    #[test]
    fn test_content_mode_parse() {
        assert_eq!(ContentMode::parse("Delta"), Some(ContentMode::Delta));
        assert_eq!(ContentMode::parse(" cumulative "), Some(ContentMode::Cumulative));
        assert_eq!(ContentMode::parse("append"), None);
        assert_eq!(ContentMode::default(), ContentMode::Cumulative);
    }
}
