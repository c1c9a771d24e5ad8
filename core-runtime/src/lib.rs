//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the playback-session crates:
//! - Logging and tracing setup
//! - Session configuration with fail-fast validation
//! - Domain event bus
//!
//! ## Overview
//!
//! Nothing in here knows about queues or identifiers. The crate only fixes the
//! conventions (how configuration is validated, how logs are emitted and
//! forwarded, how modules broadcast notable changes) that `core-playback` and
//! `core-service` build on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PendingCommandPolicy, ReconnectPolicy, SessionConfig, SessionConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
