//! # Host Bridge Traits
//!
//! Contracts between the playback-session core and the host application.
//!
//! ## Overview
//!
//! The core never talks to platform services directly. Anything that has to
//! be provided by the host (a wall clock, a log pipeline) is expressed here as
//! a trait, and every failure coming back across the boundary is a
//! [`BridgeError`].
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source; [`FixedClock`](time::FixedClock) for tests
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! Domain collaborators (the background playback engine, the playlist store)
//! are declared next to the code that consumes them, in `core-playback` and
//! `core-library`, because their signatures use domain types.
//!
//! ## Error Handling
//!
//! Host implementations convert their own failures into [`BridgeError`].
//! [`BridgeError::is_unavailable`] separates "try again later" from
//! "request rejected"; the playback connection relies on that distinction to
//! decide whether to buffer a command.
//!
//! ## Thread Safety
//!
//! All bridge traits require [`PlatformSendSync`](platform::PlatformSendSync)
//! so implementations can be shared between tokio tasks behind an `Arc`.

pub mod error;
pub mod platform;
pub mod time;

pub use error::BridgeError;
pub use platform::PlatformSendSync;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
