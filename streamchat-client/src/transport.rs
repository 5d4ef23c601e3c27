//! Chat transports.
//!
//! [`ChatTransport`] is the seam between the request controller and the
//! network. [`HttpTransport`] is the reqwest implementation that POSTs
//! `{"query": ...}` and hands back the chunked response body.

use crate::config::ClientConfig;
use crate::error::ClientResult;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use streamchat_streaming::{ByteStream, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Opens a streamed chat response.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Send `query` and return the response body once the server accepts it.
    ///
    /// Must return [`TransportError::Cancelled`] if `cancel` fires before the
    /// body is available.
    async fn open(&self, query: &str, cancel: CancellationToken) -> Result<ByteStream, TransportError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build a transport from config.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Use an existing reqwest client.
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// The chat endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, query: &str, cancel: CancellationToken) -> Result<ByteStream, TransportError> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/x-ndjson")
            .json(&ChatRequest { query });

        debug!(url = %self.endpoint, "Opening chat stream");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = request.send() => result.map_err(transport_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            return Err(TransportError::status(status.as_u16(), body));
        }

        debug!(status = status.as_u16(), "Chat stream opened");

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(transport_error)),
        ))
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(err.to_string())
    }
}
