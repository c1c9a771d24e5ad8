//! Workspace façade crate.
//!
//! Host applications depend on `playback-core-workspace` and enable the
//! feature matching the layer they need (`service`, `playback`, `library`)
//! instead of wiring each workspace crate individually.

#[cfg(feature = "service")]
pub use core_service as service;

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "library")]
pub use core_library as library;
