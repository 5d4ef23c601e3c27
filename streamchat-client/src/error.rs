//! Client error types.

use thiserror::Error;

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Endpoint is not a valid URL.
    #[error("Invalid endpoint {value:?}: {source}")]
    InvalidEndpoint {
        /// The rejected value.
        value: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// Endpoint uses a scheme other than http or https.
    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// A numeric setting could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidNumber {
        /// Setting name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Content mode name not recognised.
    #[error("Invalid content mode {0:?}, expected \"cumulative\" or \"delta\"")]
    InvalidContentMode(String),
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Result type for client construction.
pub type ClientResult<T> = Result<T, ClientError>;
