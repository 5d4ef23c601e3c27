//! Request controller.
//!
//! [`ChatController`] owns the conversation and the single live request.
//! Each send spawns a task that reads the response body, frames events, and
//! forwards them tagged with the request's [`RequestIdentity`]. The
//! controller applies tagged updates one at a time and drops any update whose
//! origin is no longer the live request, so a superseded stream can never
//! touch the conversation even if its cancellation lands late.

use crate::config::ClientConfig;
use crate::transport::ChatTransport;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use streamchat_core::{
    ConversationState, IdentitySequence, Message, RequestIdentity, StreamEvent,
};
use streamchat_streaming::{ndjson_events, TransportError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Updates buffered between a request task and the controller.
const UPDATE_BUFFER: usize = 64;

/// Lifecycle of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    /// No request has been made since the last reset.
    #[default]
    Idle,
    /// Request sent, body not yet flowing.
    Sending,
    /// Body is being consumed.
    Streaming,
    /// Stream ended cleanly.
    Completed,
    /// Cancelled by a new send, a clear, or an external abort.
    Cancelled,
    /// Transport failure.
    Failed,
}

impl RequestPhase {
    /// Check if a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestPhase::Sending | RequestPhase::Streaming)
    }
}

/// Something that happened to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestUpdate {
    /// The transport accepted the request and the body is available.
    Opened,
    /// One framed event.
    Event(StreamEvent),
    /// The stream ended, cleanly or not.
    Finished(Result<(), TransportError>),
}

/// A [`RequestUpdate`] tagged with the request it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedUpdate {
    /// The originating request.
    pub origin: RequestIdentity,
    /// The update itself.
    pub update: RequestUpdate,
}

impl TaggedUpdate {
    /// Tag an update.
    pub fn new(origin: RequestIdentity, update: RequestUpdate) -> Self {
        Self { origin, update }
    }
}

/// Result of offering an update to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update came from the live request and was applied.
    Applied,
    /// The update came from a request that is no longer live; ignored.
    Stale,
}

/// Everything a view needs to render.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChatSnapshot {
    /// Conversation in display order.
    pub messages: Vec<Message>,
    /// Progress text, only while loading.
    pub progress_text: Option<String>,
    /// Whether a request is in flight.
    pub loading: bool,
    /// Current request phase.
    pub phase: RequestPhase,
}

#[derive(Debug)]
struct RequestHandle {
    id: RequestIdentity,
    cancel: CancellationToken,
}

/// Owns the conversation and at most one live streamed request.
pub struct ChatController<T> {
    transport: Arc<T>,
    config: ClientConfig,
    conversation: ConversationState,
    phase: RequestPhase,
    live: Option<RequestHandle>,
    identities: IdentitySequence,
    updates_tx: mpsc::Sender<TaggedUpdate>,
    updates_rx: mpsc::Receiver<TaggedUpdate>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
}

impl<T: ChatTransport> ChatController<T> {
    /// Create a controller over a transport.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Create a controller over a shared transport.
    pub fn with_shared_transport(transport: Arc<T>, config: ClientConfig) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);
        let (snapshot_tx, _) = watch::channel(ChatSnapshot::default());
        let conversation = ConversationState::new().with_content_mode(config.content_mode);

        Self {
            transport,
            config,
            conversation,
            phase: RequestPhase::Idle,
            live: None,
            identities: IdentitySequence::new(),
            updates_tx,
            updates_rx,
            snapshot_tx,
        }
    }

    /// Conversation in display order.
    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Progress text of the in-flight request.
    pub fn progress_text(&self) -> Option<&str> {
        if self.is_loading() {
            self.conversation.progress_text()
        } else {
            None
        }
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Current request phase.
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Identity of the live request, if any.
    pub fn live_request(&self) -> Option<RequestIdentity> {
        self.live.as_ref().map(|handle| handle.id)
    }

    /// The underlying conversation state.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current render state.
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.conversation.messages().to_vec(),
            progress_text: self.progress_text().map(str::to_string),
            loading: self.is_loading(),
            phase: self.phase,
        }
    }

    /// Receive a fresh [`ChatSnapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Send user text, superseding any live request.
    ///
    /// Empty text is ignored and returns `None`. Whitespace is sent as is.
    pub fn send(&mut self, text: impl Into<String>) -> Option<RequestIdentity> {
        let text = text.into();
        if text.is_empty() {
            debug!("Ignoring empty message");
            return None;
        }

        if let Some(previous) = self.live.take() {
            debug!(request_id = %previous.id, "Superseding live request");
            previous.cancel.cancel();
        }

        self.conversation.append_user(text.clone());
        self.conversation.clear_progress();

        let id = self.identities.next_identity();
        let cancel = CancellationToken::new();
        tokio::spawn(drive_request(
            Arc::clone(&self.transport),
            text,
            id,
            cancel.clone(),
            self.config.max_record_bytes,
            self.updates_tx.clone(),
        ));

        self.live = Some(RequestHandle { id, cancel });
        self.phase = RequestPhase::Sending;
        debug!(request_id = %id, "Request started");
        self.publish();

        Some(id)
    }

    /// Cancel the live request. Returns `false` if nothing was in flight.
    ///
    /// No message is appended for a cancellation.
    pub fn cancel_current(&mut self) -> bool {
        match self.live.take() {
            Some(handle) => {
                debug!(request_id = %handle.id, "Request cancelled by user");
                handle.cancel.cancel();
                self.settle(RequestPhase::Cancelled);
                self.publish();
                true
            }
            None => false,
        }
    }

    /// Cancel any live request and reset the conversation.
    pub fn clear(&mut self) {
        if let Some(handle) = self.live.take() {
            debug!(request_id = %handle.id, "Request cancelled by clear");
            handle.cancel.cancel();
        }
        self.conversation.clear();
        self.phase = RequestPhase::Idle;
        self.publish();
    }

    /// Wait for the next update from any request and apply it.
    ///
    /// Pending forever if nothing was ever sent; pair it with other event
    /// sources in a `select!`, or use [`run_until_idle`](Self::run_until_idle).
    pub async fn process_next(&mut self) -> UpdateOutcome {
        match self.updates_rx.recv().await {
            Some(update) => self.apply_update(update),
            // Unreachable while `self` holds a sender.
            None => UpdateOutcome::Stale,
        }
    }

    /// Apply updates until no request is in flight.
    pub async fn run_until_idle(&mut self) {
        while self.is_loading() {
            self.process_next().await;
        }
    }

    /// Apply one tagged update, rejecting it unless it comes from the live request.
    pub fn apply_update(&mut self, tagged: TaggedUpdate) -> UpdateOutcome {
        if self.live_request() != Some(tagged.origin) {
            debug!(request_id = %tagged.origin, "Rejecting update from stale request");
            return UpdateOutcome::Stale;
        }

        match tagged.update {
            RequestUpdate::Opened => {
                if self.phase == RequestPhase::Sending {
                    self.phase = RequestPhase::Streaming;
                }
            }
            RequestUpdate::Event(event) => {
                self.phase = RequestPhase::Streaming;
                self.conversation.apply_event(&event);
            }
            RequestUpdate::Finished(Ok(())) => {
                info!(request_id = %tagged.origin, "Request completed");
                self.live = None;
                self.settle(RequestPhase::Completed);
            }
            RequestUpdate::Finished(Err(e)) if e.is_cancellation() => {
                debug!(request_id = %tagged.origin, "Request aborted");
                self.live = None;
                self.settle(RequestPhase::Cancelled);
            }
            RequestUpdate::Finished(Err(e)) => {
                error!(request_id = %tagged.origin, error = %e, "Request failed");
                self.live = None;
                self.conversation
                    .append_closed_ai(self.config.error_message.clone());
                self.settle(RequestPhase::Failed);
            }
        }

        self.publish();
        UpdateOutcome::Applied
    }

    fn settle(&mut self, phase: RequestPhase) {
        self.conversation.clear_progress();
        self.conversation.close_open_message();
        self.phase = phase;
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl<T> Drop for ChatController<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.live.take() {
            handle.cancel.cancel();
        }
    }
}

/// Open the transport and forward every framed event, tagged with `origin`.
///
/// Waits for room in the update channel, so a controller that stops
/// draining also stops the body from being read.
async fn drive_request<T: ChatTransport>(
    transport: Arc<T>,
    query: String,
    origin: RequestIdentity,
    cancel: CancellationToken,
    max_record_bytes: usize,
    updates: mpsc::Sender<TaggedUpdate>,
) {
    let body = match transport.open(&query, cancel.clone()).await {
        Ok(body) => body,
        Err(e) => {
            forward(&updates, origin, RequestUpdate::Finished(Err(e))).await;
            return;
        }
    };

    if !forward(&updates, origin, RequestUpdate::Opened).await {
        return;
    }

    let mut events = ndjson_events(body, cancel, max_record_bytes);
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                if !forward(&updates, origin, RequestUpdate::Event(event)).await {
                    return;
                }
            }
            Err(e) => {
                forward(&updates, origin, RequestUpdate::Finished(Err(e))).await;
                return;
            }
        }
    }

    forward(&updates, origin, RequestUpdate::Finished(Ok(()))).await;
}

/// Returns `false` once the controller is gone.
async fn forward(
    updates: &mpsc::Sender<TaggedUpdate>,
    origin: RequestIdentity,
    update: RequestUpdate,
) -> bool {
    updates.send(TaggedUpdate::new(origin, update)).await.is_ok()
}
