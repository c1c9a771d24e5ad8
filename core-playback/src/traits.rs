//! # Playback Engine Contract
//!
//! The background playback engine (media service, audio session, remote
//! player) lives outside this crate. It is reached through the
//! [`PlaybackEngine`] trait and reports back by pushing [`EngineEvent`]s into
//! the channel handed to [`connect`](PlaybackEngine::connect).
//!
//! ## Architecture
//!
//! ```text
//!   PlaybackSessionConnection ──EngineCommand──> PlaybackEngine
//!              ^                                     │
//!              └───────────EngineEvent (mpsc)────────┘
//! ```
//!
//! Engine events carry the queue as plain strings because they cross a
//! process or IPC boundary; the connection decodes and validates them
//! before anyone else sees them.

use crate::media_id::MediaId;
use crate::queue_title::QueueTitle;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::platform::PlatformSendSync;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Channel the engine uses to report state changes.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Transport state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
    Ended,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Idle => "idle",
            TransportState::Buffering => "buffering",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Ended => "ended",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Buffering)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of the item currently loaded in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    pub media_id: Option<MediaId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// Commands understood by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Play,
    Pause,
    SeekTo { position_ms: u64 },
    SkipToNext,
    SkipToPrevious,
    /// Replace the queue and start playing at `start_index`.
    PlayQueue {
        items: Vec<MediaId>,
        title: Option<QueueTitle>,
        start_index: usize,
    },
}

/// Command kind, used to keep at most one pending command of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Play,
    Pause,
    SeekTo,
    SkipToNext,
    SkipToPrevious,
    PlayQueue,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Play => "play",
            CommandKind::Pause => "pause",
            CommandKind::SeekTo => "seek_to",
            CommandKind::SkipToNext => "skip_to_next",
            CommandKind::SkipToPrevious => "skip_to_previous",
            CommandKind::PlayQueue => "play_queue",
        }
    }
}

impl EngineCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            EngineCommand::Play => CommandKind::Play,
            EngineCommand::Pause => CommandKind::Pause,
            EngineCommand::SeekTo { .. } => CommandKind::SeekTo,
            EngineCommand::SkipToNext => CommandKind::SkipToNext,
            EngineCommand::SkipToPrevious => CommandKind::SkipToPrevious,
            EngineCommand::PlayQueue { .. } => CommandKind::PlayQueue,
        }
    }
}

/// State changes pushed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Binding established; commands can be delivered.
    Connected,
    /// Binding lost.
    Disconnected,
    /// A new queue was loaded. Items and title are in their wire encodings.
    QueueChanged {
        items: Vec<String>,
        current_index: usize,
        title: Option<String>,
    },
    /// Same queue, different current item.
    CurrentIndexChanged(usize),
    TransportChanged(TransportState),
    PositionChanged {
        position: Duration,
        duration: Option<Duration>,
    },
    NowPlayingChanged(Option<NowPlaying>),
    Error { message: String },
}

/// Background playback engine.
///
/// `connect` only starts binding: the engine confirms with
/// [`EngineEvent::Connected`]. Implementations report an unreachable engine
/// as `BridgeError::NotAvailable` or `BridgeError::Disconnected` so the
/// connection can defer commands instead of dropping them.
#[async_trait]
pub trait PlaybackEngine: PlatformSendSync {
    async fn connect(&self, events: EngineEventSender) -> BridgeResult<()>;

    async fn disconnect(&self) -> BridgeResult<()>;

    async fn send(&self, command: EngineCommand) -> BridgeResult<()>;
}
