use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Session scope is closed")]
    ScopeClosed,

    #[error("No Tokio runtime available to run session work")]
    RuntimeUnavailable,

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
