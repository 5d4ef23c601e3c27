//! Direct helpers for scripts and one-off questions.
//!
//! # Examples
//!
//! ```rust,ignore
//! use streamchat::direct::ask;
//! use streamchat::ClientConfig;
//!
//! let snapshot = ask(ClientConfig::from_env()?, "What is the capital of France?").await?;
//! println!("{}", snapshot.messages.last().map(|m| m.content.as_str()).unwrap_or(""));
//! ```

use streamchat_client::{ChatController, ChatSnapshot, ClientConfig, ClientResult, HttpTransport};

/// Build an HTTP-backed controller from config.
pub fn connect(config: ClientConfig) -> ClientResult<ChatController<HttpTransport>> {
    let transport = HttpTransport::new(&config)?;
    Ok(ChatController::new(transport, config))
}

/// Build an HTTP-backed controller from `STREAMCHAT_*` environment variables.
pub fn connect_from_env() -> ClientResult<ChatController<HttpTransport>> {
    connect(ClientConfig::from_env()?)
}

/// Send one message, wait for the stream to finish, and return the final state.
pub async fn ask(config: ClientConfig, text: &str) -> ClientResult<ChatSnapshot> {
    let mut chat = connect(config)?;
    chat.send(text);
    chat.run_until_idle().await;
    Ok(chat.snapshot())
}
