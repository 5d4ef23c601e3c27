//! Transport stream reading.
//!
//! [`TextChunks`] turns a chunked response body into decoded text fragments
//! in wire order. Fragments carry no alignment guarantee with records.

use crate::error::{StreamResult, TransportError};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A boxed response body, as handed out by transports.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Incremental UTF-8 decoder.
///
/// Holds back an incomplete multi-byte sequence at the end of a chunk until
/// the rest of it arrives. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any held-back prefix) as possible.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is held back, lossily.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    /// Number of bytes held back.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

pin_project! {
    /// Lazy, finite sequence of decoded text fragments from a byte stream.
    ///
    /// Ends with `None` when the transport closes normally. Yields
    /// `Err(TransportError::Cancelled)` once if the attached token fires, and
    /// passes transport errors through; both end the stream.
    pub struct TextChunks<S> {
        #[pin]
        inner: S,
        decoder: Utf8Decoder,
        cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
        finished: bool,
    }
}

impl<S> TextChunks<S>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8Decoder::new(),
            cancelled: None,
            finished: false,
        }
    }

    /// Stop reading as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }
}

impl<S> Stream for TextChunks<S>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    type Item = StreamResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        // Cancellation wins over any bytes already sitting in the transport.
        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                *this.finished = true;
                return Poll::Ready(Some(Err(TransportError::Cancelled)));
            }
        }

        loop {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = this.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Poll::Ready(Some(Ok(text)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    let rest = this.decoder.finish();
                    if rest.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Ok(rest)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, TransportError>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[test]
    fn test_decoder_carries_split_multibyte() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8Decoder::new();

        // 'é' is two bytes; split between them.
        assert_eq!(decoder.decode(&bytes[..2]), "h");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&bytes[2..]), "éllo");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_finish_flushes_lossily() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xe2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_text_chunks_in_wire_order() {
        let euro = "€".as_bytes();
        let body = chunks(vec![&b"ab"[..], &euro[..1], &euro[1..], &b"cd"[..]]);
        let fragments: Vec<String> = TextChunks::new(body)
            .map(|r| r.unwrap())
            .collect()
            .await;

        // The lone lead byte produces no fragment of its own.
        assert_eq!(fragments, vec!["ab", "€", "cd"]);
    }

    #[tokio::test]
    async fn test_text_chunks_passes_transport_error_and_stops() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"one")),
            Err(TransportError::connection("reset")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut reader = TextChunks::new(body);

        assert_eq!(reader.next().await, Some(Ok("one".to_string())));
        assert_eq!(
            reader.next().await,
            Some(Err(TransportError::connection("reset")))
        );
        assert_eq!(reader.next().await, None);
    }

    #[tokio::test]
    async fn test_text_chunks_cancellation() {
        let token = CancellationToken::new();
        let body = stream::pending::<Result<Bytes, TransportError>>();
        let mut reader = TextChunks::new(body).with_cancellation(token.clone());

        token.cancel();

        let item = reader.next().await;
        assert!(matches!(item, Some(Err(ref e)) if e.is_cancellation()));
        assert_eq!(reader.next().await, None);
    }

    #[tokio::test]
    async fn test_text_chunks_cancellation_beats_buffered_bytes() {
        let token = CancellationToken::new();
        token.cancel();
        let mut reader = TextChunks::new(chunks(vec![&b"data"[..]])).with_cancellation(token);

        assert_eq!(reader.next().await, Some(Err(TransportError::Cancelled)));
    }
}
