//! Marker traits keeping bridge bounds in one place.
//!
//! Every collaborator the core talks to (playback engine, logger sink,
//! clock) is shared across tokio tasks, so implementations must be
//! `Send + Sync`. Bounding on these markers instead of spelling out the
//! auto traits keeps the trait definitions uniform.

/// `Send + Sync`, implemented for every type that satisfies both.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
