//! # Transient Messages
//!
//! Dismissible notifications ("Saved as playlist", error text) shown to the
//! user, plus explicit acknowledgement.
//!
//! ## Delivery
//!
//! Messages go through one ordered channel with exactly one active
//! consumer. [`MessageHub::subscribe`] hands out a fresh [`MessageStream`]
//! and detaches the previous one. Messages shown while nobody is subscribed
//! are kept for the next subscriber, up to [`MAX_BACKLOG`]; past that the
//! oldest undelivered message is discarded.
//!
//! ## Acknowledgement
//!
//! Every message carries a [`MessageId`]. [`MessageHub::acknowledge`] is
//! idempotent: only the first call for a shown id is broadcast, so a handler
//! waiting on [`MessageHub::wait_for_acknowledgement`] fires once and acts
//! on that message's own payload.
//!
//! The hub remembers the last [`MAX_TRACKED`] shown messages. Older ids are
//! forgotten and acknowledging them is a no-op, as is acknowledging an id
//! the hub never showed.

use core_library::models::Playlist;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

const ACK_CHANNEL_CAPACITY: usize = 32;

/// Undelivered messages kept while no consumer is attached.
pub const MAX_BACKLOG: usize = 64;

/// Shown messages whose acknowledgement state is remembered.
pub const MAX_TRACKED: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientMessage {
    /// The queue was saved; acknowledging opens the playlist.
    SavedAsPlaylist(Playlist),
    Error(String),
}

impl TransientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            TransientMessage::SavedAsPlaylist(_) => "saved_as_playlist",
            TransientMessage::Error(_) => "error",
        }
    }

    /// Text to display.
    pub fn text(&self) -> String {
        match self {
            TransientMessage::SavedAsPlaylist(playlist) => {
                format!("Saved as playlist \"{}\"", playlist.name)
            }
            TransientMessage::Error(message) => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub id: MessageId,
    pub message: TransientMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckState {
    Outstanding,
    Acknowledged,
}

struct HubState {
    consumer: Option<mpsc::UnboundedSender<MessageEnvelope>>,
    backlog: VecDeque<MessageEnvelope>,
    /// Oldest first.
    tracked: VecDeque<(MessageId, AckState)>,
}

impl HubState {
    fn ack_state(&self, id: MessageId) -> Option<AckState> {
        self.tracked
            .iter()
            .find(|(tracked, _)| *tracked == id)
            .map(|(_, state)| *state)
    }

    fn track(&mut self, id: MessageId) {
        if self.tracked.len() == MAX_TRACKED {
            self.tracked.pop_front();
        }
        self.tracked.push_back((id, AckState::Outstanding));
    }

    fn forget(&mut self, id: MessageId) {
        self.tracked.retain(|(tracked, _)| *tracked != id);
    }

    fn keep(&mut self, envelope: MessageEnvelope) {
        if self.backlog.len() == MAX_BACKLOG {
            if let Some(dropped) = self.backlog.pop_front() {
                warn!(message_id = %dropped.id, "Message backlog full; discarding oldest message");
                self.forget(dropped.id);
            }
        }
        self.backlog.push_back(envelope);
    }
}

pub struct MessageHub {
    state: Mutex<HubState>,
    acks: broadcast::Sender<MessageId>,
    event_bus: Arc<EventBus>,
}

impl MessageHub {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        let (acks, _) = broadcast::channel(ACK_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(HubState {
                consumer: None,
                backlog: VecDeque::new(),
                tracked: VecDeque::new(),
            }),
            acks,
            event_bus,
        }
    }

    /// Queue a message for the active consumer.
    pub fn show(&self, message: TransientMessage) -> MessageId {
        let envelope = MessageEnvelope {
            id: MessageId::new(),
            message,
        };
        let id = envelope.id;
        let kind = envelope.message.kind();

        {
            let mut state = self.state.lock();
            state.track(id);
            let undelivered = match &state.consumer {
                Some(consumer) => consumer.send(envelope).err().map(|e| e.0),
                None => Some(envelope),
            };
            if let Some(envelope) = undelivered {
                debug!(message_id = %id, "No active message consumer; keeping message");
                state.consumer = None;
                state.keep(envelope);
            }
        }

        info!(message_id = %id, kind, "Transient message shown");
        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::MessageShown {
                message_id: id.to_string(),
                kind: kind.to_string(),
            }))
            .ok();
        id
    }

    /// Become the consumer. The previous stream, if any, ends.
    pub fn subscribe(&self) -> MessageStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        while let Some(envelope) = state.backlog.pop_front() {
            // Receiver is held right here.
            let _ = sender.send(envelope);
        }
        if state.consumer.replace(sender).is_some() {
            debug!("Replacing previous message consumer");
        }
        MessageStream { receiver }
    }

    /// Mark a shown message as acknowledged. Returns `true` on the first
    /// call for `id`, and `false` for repeats and for ids the hub does not
    /// track.
    pub fn acknowledge(&self, id: MessageId) -> bool {
        {
            let mut state = self.state.lock();
            let Some(entry) = state.tracked.iter_mut().find(|(tracked, _)| *tracked == id) else {
                debug!(message_id = %id, "Acknowledged message is not tracked");
                return false;
            };
            if entry.1 == AckState::Acknowledged {
                debug!(message_id = %id, "Message already acknowledged");
                return false;
            }
            entry.1 = AckState::Acknowledged;
        }

        // Waiters subscribe before reading the state, so none can miss this.
        let _ = self.acks.send(id);
        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::MessageAcknowledged {
                message_id: id.to_string(),
            }))
            .ok();
        true
    }

    pub fn is_acknowledged(&self, id: MessageId) -> bool {
        self.state.lock().ack_state(id) == Some(AckState::Acknowledged)
    }

    /// Shown and tracked, but not acknowledged yet.
    pub fn is_outstanding(&self, id: MessageId) -> bool {
        self.state.lock().ack_state(id) == Some(AckState::Outstanding)
    }

    /// Resolves once `id` has been acknowledged, immediately if it already
    /// was. Never resolves for an id the hub does not track.
    pub async fn wait_for_acknowledgement(&self, id: MessageId) {
        let mut acks = self.acks.subscribe();
        let current = self.state.lock().ack_state(id);
        match current {
            Some(AckState::Acknowledged) => return,
            Some(AckState::Outstanding) => {}
            None => {
                debug!(message_id = %id, "Waiting on an untracked message");
            }
        }

        loop {
            match acks.recv().await {
                Ok(acked) if acked == id => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if self.is_acknowledged(id) {
                        return;
                    }
                }
                // The hub owns the sender and `self` borrows the hub.
                Err(broadcast::error::RecvError::Closed) => {
                    return futures::future::pending().await
                }
            }
        }
    }
}

impl fmt::Debug for MessageHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageHub")
            .field("has_consumer", &state.consumer.is_some())
            .field("backlog", &state.backlog.len())
            .field("tracked", &state.tracked.len())
            .finish()
    }
}

/// The active consumer's view of the message channel.
#[derive(Debug)]
pub struct MessageStream {
    receiver: mpsc::UnboundedReceiver<MessageEnvelope>,
}

impl MessageStream {
    /// Next message, or `None` once this stream has been replaced.
    pub async fn recv(&mut self) -> Option<MessageEnvelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MessageEnvelope> {
        self.receiver.try_recv().ok()
    }
}
