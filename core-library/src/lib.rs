//! # Library Module
//!
//! Owns the playlist store used to persist queue snapshots.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pool, schema and migrations
//! - The [`Playlist`](models::Playlist) record
//! - [`PlaylistRepository`](repositories::PlaylistRepository), the storage
//!   collaborator behind "save queue as playlist"

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{Playlist, PlaylistId};
pub use repositories::{PlaylistRepository, SqlitePlaylistRepository};
