//! Terminal chat example.
//!
//! Reads lines from stdin and renders the streamed answer as it arrives.
//! Type `/cancel` to abort the current answer, `/clear` to start over,
//! `/quit` to leave.
//!
//! Run with:
//! ```bash
//! STREAMCHAT_ENDPOINT=http://localhost:5000/api/chat cargo run --example terminal_chat
//! ```

use std::io::{self, Write};
use streamchat::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Prints only what changed since the last snapshot.
#[derive(Default)]
struct Renderer {
    shown_messages: usize,
    shown_tail: String,
    shown_progress: Option<String>,
}

impl Renderer {
    fn render(&mut self, snapshot: &ChatSnapshot) -> io::Result<()> {
        let mut out = io::stdout().lock();

        if snapshot.messages.len() < self.shown_messages {
            writeln!(out, "\n--- conversation cleared ---")?;
            *self = Self::default();
        }

        if snapshot.progress_text != self.shown_progress {
            if let Some(progress) = &snapshot.progress_text {
                writeln!(out, "  … {progress}")?;
            }
            self.shown_progress = snapshot.progress_text.clone();
        }

        for (index, message) in snapshot.messages.iter().enumerate() {
            let is_tail = index + 1 == snapshot.messages.len();
            if index + 1 < self.shown_messages {
                continue;
            }
            if index + 1 == self.shown_messages {
                // Already started printing this one; show only the new part.
                if let Some(rest) = message.content.strip_prefix(self.shown_tail.as_str()) {
                    write!(out, "{rest}")?;
                } else {
                    write!(out, "\n{}: {}", message.role, message.content)?;
                }
            } else if message.role == Role::Ai {
                write!(out, "\n{}: {}", message.role, message.content)?;
            }
            if is_tail {
                self.shown_tail = message.content.clone();
            }
        }
        self.shown_messages = snapshot.messages.len();

        if !snapshot.loading && matches!(snapshot.phase, RequestPhase::Completed | RequestPhase::Failed) {
            writeln!(out)?;
        }
        out.flush()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    println!("💬 Chatting with {}", config.endpoint);
    println!("Commands: /cancel, /clear, /quit\n");

    let mut chat = streamchat::direct::connect(config)?;
    let mut view = chat.subscribe();
    let mut renderer = Renderer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/clear" => chat.clear(),
                    "/cancel" => {
                        if chat.cancel_current() {
                            println!("(cancelled)");
                        }
                    }
                    text => {
                        if chat.send(text).is_none() {
                            continue;
                        }
                    }
                }
            }
            _ = chat.process_next(), if chat.is_loading() => {}
        }

        if view.has_changed().unwrap_or(false) {
            let snapshot = view.borrow_and_update().clone();
            renderer.render(&snapshot)?;
        }
    }

    tracing::debug!(messages = chat.messages().len(), "Exiting");
    Ok(())
}
