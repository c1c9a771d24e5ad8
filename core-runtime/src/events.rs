//! # Event Bus System
//!
//! Domain event broadcasting for the playback session core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The observable streams on the playback connection carry *state*. The event
//! bus carries *facts*: "the engine disconnected", "a playlist was created",
//! "a navigation request was issued". Consumers such as analytics or the
//! notification renderer subscribe here when they care about the transition
//! rather than the resulting value.
//!
//! ```text
//! ┌──────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │ Playback conn.   ├────────>│          ├────────────>│ Subscriber │
//! └──────────────────┘         │ EventBus │             └────────────┘
//! ┌──────────────────┐  emit   │          │  subscribe  ┌────────────┐
//! │ Queue persistence├────────>│          ├────────────>│ Subscriber │
//! └──────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
//!     playlist_id: "pl-1".to_string(),
//!     name: "Road trip".to_string(),
//!     item_count: 12,
//! }))
//! .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Playlist created");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender is gone. Treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers in this workspace
//! ignore that result since nobody listening is a normal state.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Engine connectivity and transport events
    Playback(PlaybackEvent),
    /// Persisted-record events
    Library(LibraryEvent),
    /// Outcomes of user intents
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::EngineDisconnected { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::CommandDeferred { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::EngineConnected) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::PlaylistCreated { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events raised by the playback session connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Binding to the background engine succeeded.
    EngineConnected,
    /// The engine binding dropped.
    EngineDisconnected {
        /// Whether an automatic reconnect is scheduled.
        will_retry: bool,
    },
    /// A new queue instance replaced the previous one.
    QueueReplaced {
        /// Encoded identifier of the queue's source, if the queue is titled.
        source: Option<String>,
        /// Number of items in the new queue.
        item_count: usize,
        /// Index of the current item.
        current_index: usize,
    },
    /// Transport state changed (playing, paused, buffering, ...).
    TransportChanged {
        /// Lower-case state name.
        state: String,
    },
    /// A command was held back because the engine was unreachable.
    CommandDeferred {
        /// Command kind (e.g. "seek_to").
        command: String,
    },
    /// The engine reported an error.
    Error {
        /// Human-readable error message.
        message: String,
        /// Whether playback can continue.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::EngineConnected => "Playback engine connected",
            PlaybackEvent::EngineDisconnected { .. } => "Playback engine disconnected",
            PlaybackEvent::QueueReplaced { .. } => "Playback queue replaced",
            PlaybackEvent::TransportChanged { .. } => "Transport state changed",
            PlaybackEvent::CommandDeferred { .. } => "Playback command deferred",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to persisted records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A playlist was created from a queue snapshot.
    PlaylistCreated {
        playlist_id: String,
        name: String,
        item_count: usize,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Outcomes produced by the session command orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A transient message was queued for display.
    MessageShown {
        message_id: String,
        /// Message kind (e.g. "saved_as_playlist", "error").
        kind: String,
    },
    /// A transient message was acknowledged for the first time.
    MessageAcknowledged { message_id: String },
    /// A navigation request was issued.
    NavigationRequested {
        /// Fully resolved route.
        route: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::MessageShown { .. } => "Transient message shown",
            SessionEvent::MessageAcknowledged { .. } => "Transient message acknowledged",
            SessionEvent::NavigationRequested { .. } => "Navigation requested",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same set of
/// subscribers. Each [`subscribe`](EventBus::subscribe) call creates an
/// independent receiver that sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// # Errors
    ///
    /// Fails when there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let playback_only =
///     EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` when nothing
    /// matching is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_replaced(count: usize) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::QueueReplaced {
            source: Some("album:fake-id".to_string()),
            item_count: count,
            current_index: 0,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors() {
        let bus = EventBus::default();
        assert!(bus.emit(CoreEvent::Playback(PlaybackEvent::EngineConnected)).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = queue_replaced(3);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        for count in 1..=4 {
            bus.emit(queue_replaced(count)).ok();
        }

        for count in 1..=4 {
            assert_eq!(sub.recv().await.unwrap(), queue_replaced(count));
        }
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(CoreEvent::Playback(PlaybackEvent::EngineConnected))
            .ok();
        let created = CoreEvent::Library(LibraryEvent::PlaylistCreated {
            playlist_id: "pl-1".to_string(),
            name: "Mix".to_string(),
            item_count: 2,
        });
        bus.emit(created.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for count in 0..5 {
            bus.emit(queue_replaced(count)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            message: "decoder crashed".to_string(),
            recoverable: true,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let lost = CoreEvent::Playback(PlaybackEvent::EngineDisconnected { will_retry: true });
        assert_eq!(lost.severity(), EventSeverity::Warning);

        let nav = CoreEvent::Session(SessionEvent::NavigationRequested {
            route: "search".to_string(),
        });
        assert_eq!(nav.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Session(SessionEvent::MessageAcknowledged {
            message_id: "m-1".to_string(),
        });
        assert_eq!(event.description(), "Transient message acknowledged");
    }

    #[test]
    fn test_event_serialization() {
        let event = queue_replaced(7);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("album:fake-id"));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(CoreEvent::Playback(PlaybackEvent::EngineConnected))
            .ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, CoreEvent::Playback(PlaybackEvent::EngineConnected));
    }
}
