//! Client configuration.

use crate::error::ConfigError;
use std::time::Duration;
use streamchat_core::ContentMode;
use streamchat_streaming::DEFAULT_MAX_RECORD_BYTES;
use url::Url;

/// Environment variable for the chat endpoint.
pub const ENV_ENDPOINT: &str = "STREAMCHAT_ENDPOINT";
/// Environment variable for the connect timeout, in seconds.
pub const ENV_CONNECT_TIMEOUT: &str = "STREAMCHAT_CONNECT_TIMEOUT_SECS";
/// Environment variable for the whole-request timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "STREAMCHAT_REQUEST_TIMEOUT_SECS";
/// Environment variable for the content mode.
pub const ENV_CONTENT_MODE: &str = "STREAMCHAT_CONTENT_MODE";

/// Configuration for the chat client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chat endpoint that accepts `POST {"query": ...}`.
    pub endpoint: Url,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// Timeout for the whole request, body included. `None` lets streams run.
    pub request_timeout: Option<Duration>,
    /// Text appended as an assistant message when a request fails.
    pub error_message: String,
    /// How `response` events are reconciled.
    pub content_mode: ContentMode,
    /// Largest unterminated record the framer will buffer.
    pub max_record_bytes: usize,
}

impl ClientConfig {
    /// Default chat endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:5000/api/chat";

    /// Default failure notice.
    pub const DEFAULT_ERROR_MESSAGE: &'static str =
        "Sorry, something went wrong. Please try again.";

    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `STREAMCHAT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config = config.with_endpoint(&endpoint)?;
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT) {
            config.connect_timeout = parse_secs(ENV_CONNECT_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout = Some(parse_secs(ENV_REQUEST_TIMEOUT, &value)?);
        }
        if let Some(value) = lookup(ENV_CONTENT_MODE) {
            config.content_mode =
                ContentMode::parse(&value).ok_or(ConfigError::InvalidContentMode(value))?;
        }

        Ok(config)
    }

    /// Set the endpoint from a string.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            value: endpoint.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        self.endpoint = url;
        Ok(self)
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the whole-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the failure notice.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Set the content mode.
    pub fn content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = mode;
        self
    }

    /// Set the record size limit.
    pub fn max_record_bytes(mut self, limit: usize) -> Self {
        self.max_record_bytes = limit;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(Self::DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            error_message: Self::DEFAULT_ERROR_MESSAGE.to_string(),
            content_mode: ContentMode::Cumulative,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}
