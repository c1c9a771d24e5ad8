//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! - Traits define the interface consumed by the playback core
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling

pub mod playlist;

pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
