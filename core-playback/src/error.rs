//! # Playback Error Types

use thiserror::Error;

/// Errors raised by the playback session layer.
///
/// None of these reach command callers: commands are fire-and-forget and
/// engine trouble only shows up in the connection status.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Queue index outside `0..len` (or non-zero for an empty queue).
    #[error("Invalid queue index {index} for a queue of {len} items")]
    InvalidQueueIndex { index: usize, len: usize },

    /// A Tokio runtime is required to start the session connection.
    #[error("No Tokio runtime available to run the playback session")]
    RuntimeUnavailable,
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
