//! Newline-delimited JSON event framing.
//!
//! Text fragments are appended to a carry-over buffer and split on `\n`.
//! Every segment but the last is a complete record; the last is kept until
//! more text arrives. Records are trimmed, blank ones are dropped, and each
//! remaining record is parsed as one JSON event. A record that fails to parse
//! is logged and skipped; it never ends the stream. Whatever is left in the
//! carry-over at end-of-stream is discarded.

use crate::error::{ParseError, StreamResult};
use crate::transport::{ByteStream, TextChunks};
use futures::Stream;
use pin_project_lite::pin_project;
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use streamchat_core::StreamEvent;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default cap on an unterminated record.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireRecord {
    Status { content: String },
    Response { content: String },
    #[serde(other)]
    Unknown,
}

/// Parse one trimmed record.
///
/// Returns `Ok(None)` for records with an unrecognised `type`.
pub fn parse_record(record: &str) -> Result<Option<StreamEvent>, ParseError> {
    let wire: WireRecord =
        serde_json::from_str(record).map_err(|source| ParseError::json(record, source))?;

    Ok(match wire {
        WireRecord::Status { content } => Some(StreamEvent::Status { content }),
        WireRecord::Response { content } => Some(StreamEvent::Response { content }),
        WireRecord::Unknown => None,
    })
}

/// Push-based framer for newline-delimited JSON events.
#[derive(Debug)]
pub struct NdjsonFramer {
    carry: String,
    max_record_bytes: usize,
    // Set after an oversized partial record was dropped; skip to the next newline.
    discarding: bool,
    skipped: usize,
}

impl Default for NdjsonFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonFramer {
    /// Create a framer with the default record limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_record_bytes(DEFAULT_MAX_RECORD_BYTES)
    }

    /// Create a framer with a custom limit on unterminated records.
    #[must_use]
    pub fn with_max_record_bytes(max_record_bytes: usize) -> Self {
        Self {
            carry: String::new(),
            max_record_bytes,
            discarding: false,
            skipped: 0,
        }
    }

    /// Feed one text fragment and return the events it completed, in order.
    pub fn feed_str(&mut self, fragment: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let mut rest = fragment;

        if self.discarding {
            match rest.find('\n') {
                Some(pos) => {
                    rest = &rest[pos + 1..];
                    self.discarding = false;
                }
                None => return events,
            }
        }

        self.carry.push_str(rest);

        if rest.contains('\n') {
            let buffered = std::mem::take(&mut self.carry);
            let mut segments = buffered.split('\n');
            let tail = segments.next_back().unwrap_or("");
            for segment in segments {
                self.push_record(segment.trim(), &mut events);
            }
            self.carry = tail.to_string();
        }

        if self.carry.len() > self.max_record_bytes {
            let error = ParseError::Oversized {
                len: self.carry.len(),
                limit: self.max_record_bytes,
            };
            warn!(%error, "Discarding oversized stream record");
            self.carry.clear();
            self.discarding = true;
            self.skipped += 1;
        }

        events
    }

    fn push_record(&mut self, record: &str, events: &mut Vec<StreamEvent>) {
        if record.is_empty() {
            return;
        }

        match parse_record(record) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => debug!(record, "Ignoring stream record with unknown type"),
            Err(error) => {
                warn!(%error, "Skipping malformed stream record");
                self.skipped += 1;
            }
        }
    }

    /// Signal end-of-stream. An unterminated trailing record is discarded.
    pub fn finish(&mut self) {
        if !self.carry.trim().is_empty() {
            debug!(len = self.carry.len(), "Discarding unterminated trailing record");
        }
        self.clear();
    }

    /// Number of records dropped because they were malformed or oversized.
    pub fn skipped_records(&self) -> usize {
        self.skipped
    }

    /// Bytes currently held in the carry-over buffer.
    pub fn buffered_len(&self) -> usize {
        self.carry.len()
    }

    /// Reset the buffer.
    pub fn clear(&mut self) {
        self.carry.clear();
        self.discarding = false;
    }
}

pin_project! {
    /// Stream adapter that frames events out of a text fragment stream.
    ///
    /// Parse failures are handled inside the framer, so the only errors this
    /// yields are transport errors (including cancellation) from the source.
    pub struct EventStream<S> {
        #[pin]
        inner: S,
        framer: NdjsonFramer,
        pending: VecDeque<StreamEvent>,
        finished: bool,
    }
}

impl<S> EventStream<S>
where
    S: Stream<Item = StreamResult<String>>,
{
    /// Create an event stream over text fragments.
    pub fn new(inner: S) -> Self {
        Self::with_framer(inner, NdjsonFramer::new())
    }

    /// Create an event stream with a preconfigured framer.
    pub fn with_framer(inner: S, framer: NdjsonFramer) -> Self {
        Self {
            inner,
            framer,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// The underlying framer.
    pub fn framer(&self) -> &NdjsonFramer {
        &self.framer
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = StreamResult<String>>,
{
    type Item = StreamResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(text))) => {
                    this.pending.extend(this.framer.feed_str(&text));
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    this.framer.clear();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.framer.finish();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Build the full pipeline over a response body: decode, frame, parse.
pub fn ndjson_events(
    body: ByteStream,
    cancel: CancellationToken,
    max_record_bytes: usize,
) -> EventStream<TextChunks<ByteStream>> {
    EventStream::with_framer(
        TextChunks::new(body).with_cancellation(cancel),
        NdjsonFramer::with_max_record_bytes(max_record_bytes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const THREE_RECORDS: &str = concat!(
        r#"{"type":"status","content":"thinking"}"#,
        "\n",
        r#"{"type":"response","content":"H"}"#,
        "\n",
        r#"{"type":"response","content":"He"}"#,
        "\n",
    );

    fn expected_three() -> Vec<StreamEvent> {
        vec![
            StreamEvent::status("thinking"),
            StreamEvent::response("H"),
            StreamEvent::response("He"),
        ]
    }

    fn feed_all(framer: &mut NdjsonFramer, fragments: &[&str]) -> Vec<StreamEvent> {
        fragments.iter().flat_map(|f| framer.feed_str(f)).collect()
    }

    #[test]
    fn test_whole_payload_in_one_fragment() {
        let mut framer = NdjsonFramer::new();
        assert_eq!(framer.feed_str(THREE_RECORDS), expected_three());
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_any_split_yields_same_events() {
        let len = THREE_RECORDS.len();
        for i in 0..=len {
            for j in i..=len {
                let mut framer = NdjsonFramer::new();
                let fragments = [
                    &THREE_RECORDS[..i],
                    &THREE_RECORDS[i..j],
                    &THREE_RECORDS[j..],
                ];
                assert_eq!(
                    feed_all(&mut framer, &fragments),
                    expected_three(),
                    "split at {i}/{j}"
                );
            }
        }
    }

    #[test]
    fn test_record_split_across_many_fragments() {
        let mut framer = NdjsonFramer::new();
        assert!(framer.feed_str(r#"{"type":"resp"#).is_empty());
        assert!(framer.feed_str(r#"onse","con"#).is_empty());
        assert!(framer.feed_str(r#"tent":"Hel"#).is_empty());
        assert_eq!(framer.feed_str("lo\"}\n"), vec![StreamEvent::response("Hello")]);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let mut framer = NdjsonFramer::new();
        let events = framer.feed_str(concat!(
            r#"{"type":"response","content":"a"}"#,
            "\n",
            r#"{"type":"response","content":"#,
            "\n",
            r#"{"type":"response","content":"ab"}"#,
            "\n",
        ));

        assert_eq!(
            events,
            vec![StreamEvent::response("a"), StreamEvent::response("ab")]
        );
        assert_eq!(framer.skipped_records(), 1);
    }

    #[rstest]
    #[case::blank_lines("\n\n  \n{\"type\":\"status\",\"content\":\"x\"}\n\n")]
    #[case::crlf("{\"type\":\"status\",\"content\":\"x\"}\r\n")]
    #[case::padded("   {\"type\":\"status\",\"content\":\"x\"}   \n")]
    fn test_record_trimming(#[case] input: &str) {
        let mut framer = NdjsonFramer::new();
        assert_eq!(framer.feed_str(input), vec![StreamEvent::status("x")]);
        assert_eq!(framer.skipped_records(), 0);
    }

    #[rstest]
    #[case::unknown_type(r#"{"type":"usage","tokens":12}"#, Ok(None))]
    #[case::status(r#"{"type":"status","content":"s"}"#, Ok(Some(StreamEvent::status("s"))))]
    #[case::missing_type(r#"{"content":"s"}"#, Err(()))]
    #[case::missing_content(r#"{"type":"response"}"#, Err(()))]
    #[case::not_json("hello", Err(()))]
    fn test_parse_record(#[case] record: &str, #[case] expected: Result<Option<StreamEvent>, ()>) {
        assert_eq!(parse_record(record).map_err(|_| ()), expected);
    }

    #[test]
    fn test_unknown_type_is_not_counted_as_skipped() {
        let mut framer = NdjsonFramer::new();
        assert!(framer.feed_str("{\"type\":\"usage\"}\n").is_empty());
        assert_eq!(framer.skipped_records(), 0);
    }

    #[test]
    fn test_finish_discards_unterminated_record() {
        let mut framer = NdjsonFramer::new();
        assert!(framer
            .feed_str(r#"{"type":"response","content":"tail"}"#)
            .is_empty());
        framer.finish();
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_oversized_record_is_dropped_until_newline() {
        let mut framer = NdjsonFramer::with_max_record_bytes(16);
        assert!(framer.feed_str(r#"{"type":"response","content":"#).is_empty());
        assert_eq!(framer.buffered_len(), 0);
        assert_eq!(framer.skipped_records(), 1);

        // The rest of the oversized record is skipped, the next one survives.
        let events = framer.feed_str("\"xxxx\"}\n{\"type\":\"status\",\"content\":\"ok\"}\n");
        assert_eq!(events, vec![StreamEvent::status("ok")]);
    }

    #[tokio::test]
    async fn test_event_stream_over_fragments() {
        let fragments = vec![
            Ok(r#"{"type":"status","#.to_string()),
            Ok("\"content\":\"thinking\"}\n{\"type\":\"resp".to_string()),
            Ok("onse\",\"content\":\"H\"}\n".to_string()),
            Ok(r#"{"type":"response","content":"unterminated"}"#.to_string()),
        ];
        let events: Vec<_> = EventStream::new(stream::iter(fragments)).collect().await;

        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::status("thinking")),
                Ok(StreamEvent::response("H")),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_stream_surfaces_transport_error_after_events() {
        let fragments = vec![
            Ok("{\"type\":\"response\",\"content\":\"H\"}\n".to_string()),
            Err(TransportError::connection("reset")),
        ];
        let mut events = EventStream::new(stream::iter(fragments));

        assert_eq!(events.next().await, Some(Ok(StreamEvent::response("H"))));
        assert_eq!(
            events.next().await,
            Some(Err(TransportError::connection("reset")))
        );
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn test_event_stream_waits_for_newline() {
        let (tx, rx) = futures::channel::mpsc::unbounded::<StreamResult<String>>();
        let mut events = tokio_test::task::spawn(EventStream::new(rx));

        tx.unbounded_send(Ok(r#"{"type":"status","content":"x"}"#.to_string()))
            .unwrap();
        tokio_test::assert_pending!(events.poll_next());

        tx.unbounded_send(Ok("\n".to_string())).unwrap();
        assert!(events.is_woken());
        tokio_test::assert_ready_eq!(events.poll_next(), Some(Ok(StreamEvent::status("x"))));

        drop(tx);
        tokio_test::assert_ready_eq!(events.poll_next(), None);
    }

    #[tokio::test]
    async fn test_ndjson_events_pipeline() {
        let body: ByteStream = Box::pin(stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"{\"type\":\"response\",\"content\":\"caf")),
            Ok(bytes::Bytes::from_static(&[0xc3])),
            Ok(bytes::Bytes::from_static(&[0xa9, b'"', b'}', b'\n'])),
        ]));
        let events: Vec<_> = ndjson_events(body, CancellationToken::new(), DEFAULT_MAX_RECORD_BYTES)
            .collect()
            .await;

        assert_eq!(events, vec![Ok(StreamEvent::response("café"))]);
    }
}
