//! # Playback Session Module
//!
//! Keeps the background playback engine's view of "what is playing, from
//! where, in what order" consistent with every observer.
//!
//! ## Overview
//!
//! This module handles:
//! - [`MediaId`] and [`QueueTitle`], the string encodings used in
//!   notifications, deep links and saved playlists
//! - [`PlaybackQueueState`], the immutable queue snapshot
//! - [`PlaybackSessionConnection`], the single writer of queue and transport
//!   state, with hot observable streams and a fire-and-forget command surface
//! - [`QueuePersistence`], saving queue snapshots as playlists
//!
//! The engine itself is an external collaborator reached through
//! [`PlaybackEngine`].

pub mod connection;
pub mod error;
pub mod media_id;
pub mod observable;
pub mod persistence;
pub mod queue;
pub mod queue_title;
pub mod traits;

pub use connection::{
    ConnectionState, PlaybackConnection, PlaybackPosition, PlaybackSessionConnection,
    PlaybackStatus,
};
pub use error::{PlaybackError, Result};
pub use media_id::{DecodeError, MediaId, MediaType};
pub use observable::{ObservableCell, Subscription};
pub use persistence::{PersistenceError, PlaylistQueuePersistence, QueuePersistence};
pub use queue::PlaybackQueueState;
pub use queue_title::{ParseError, QueueTitle};
pub use traits::{
    CommandKind, EngineCommand, EngineEvent, EngineEventSender, NowPlaying, PlaybackEngine,
    TransportState,
};
