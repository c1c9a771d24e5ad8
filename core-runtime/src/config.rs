//! # Session Configuration
//!
//! Tunables for the playback session core.
//!
//! ## Overview
//!
//! [`SessionConfig`] is built with [`SessionConfigBuilder`] and validated
//! before it is handed out, so an invalid combination (a zero-capacity stream,
//! a reconnect policy whose ceiling is below its first delay) fails at
//! start-up with an actionable message instead of misbehaving at runtime.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{PendingCommandPolicy, SessionConfig};
//! use std::time::Duration;
//!
//! let config = SessionConfig::builder()
//!     .pending_command_policy(PendingCommandPolicy::KeepLatestPerKind)
//!     .reconnect_delays(Duration::from_millis(250), Duration::from_secs(8))
//!     .default_playlist_name("Saved queue")
//!     .build()
//!     .expect("valid configuration");
//!
//! assert_eq!(config.default_playlist_name, "Saved queue");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::SessionConfig;
//!
//! SessionConfig::builder()
//!     .event_buffer_size(0)
//!     .build()
//!     .expect("zero buffer is rejected");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Upper bound for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// What the playback connection does with commands issued while the
/// background engine is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingCommandPolicy {
    /// Keep the most recent pending command of each kind and replay them,
    /// in submission order, once the engine connects.
    #[default]
    KeepLatestPerKind,
    /// Discard commands issued while disconnected.
    Drop,
}

/// Exponential backoff used to rebind to the background engine after an
/// unexpected disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay
    pub max_delay: Duration,
    /// Retries before giving up until the next explicit `connect()`
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Policy that never retries on its own.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.initial_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }

    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.initial_delay.is_zero() {
            return Err(Error::Config(
                "Reconnect initial delay must be greater than zero".to_string(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(Error::Config(format!(
                "Reconnect max delay ({:?}) is shorter than the initial delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "Reconnect enabled with zero attempts. Use ReconnectPolicy::disabled() instead."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 8,
        }
    }
}

/// Validated configuration for the playback session core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Handling of commands issued while the engine is unreachable
    pub pending_command_policy: PendingCommandPolicy,

    /// Automatic rebinding after an unexpected disconnect
    pub reconnect: ReconnectPolicy,

    /// Capacity of the domain event bus
    pub event_buffer_size: usize,

    /// Playlist name used when neither the caller nor the queue title
    /// provides one
    pub default_playlist_name: String,

    /// Bind to the engine as soon as the session core is built
    pub auto_connect: bool,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Checks:
    /// - the event buffer size is within `1..=MAX_EVENT_BUFFER_SIZE`
    /// - the default playlist name is not blank
    /// - the reconnect policy is coherent when enabled
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 || self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size must be between 1 and {}, got {}",
                MAX_EVENT_BUFFER_SIZE, self.event_buffer_size
            )));
        }

        if self.default_playlist_name.trim().is_empty() {
            return Err(Error::Config(
                "Default playlist name cannot be blank".to_string(),
            ));
        }

        self.reconnect.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pending_command_policy: PendingCommandPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            event_buffer_size: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
            default_playlist_name: "Queue".to_string(),
            auto_connect: true,
        }
    }
}

/// Builder for [`SessionConfig`]. Unset fields take the defaults of
/// [`SessionConfig::default`].
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    pending_command_policy: Option<PendingCommandPolicy>,
    reconnect: Option<ReconnectPolicy>,
    event_buffer_size: Option<usize>,
    default_playlist_name: Option<String>,
    auto_connect: Option<bool>,
}

impl SessionConfigBuilder {
    pub fn pending_command_policy(mut self, policy: PendingCommandPolicy) -> Self {
        self.pending_command_policy = Some(policy);
        self
    }

    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Keeps the rest of the reconnect policy and only changes its delays.
    pub fn reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        let mut policy = self.reconnect.take().unwrap_or_default();
        policy.initial_delay = initial;
        policy.max_delay = max;
        self.reconnect = Some(policy);
        self
    }

    pub fn disable_reconnect(mut self) -> Self {
        self.reconnect = Some(ReconnectPolicy::disabled());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn default_playlist_name(mut self, name: impl Into<String>) -> Self {
        self.default_playlist_name = Some(name.into());
        self
    }

    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = Some(enabled);
        self
    }

    /// Assemble and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn build(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();

        let config = SessionConfig {
            pending_command_policy: self
                .pending_command_policy
                .unwrap_or(defaults.pending_command_policy),
            reconnect: self.reconnect.unwrap_or(defaults.reconnect),
            event_buffer_size: self.event_buffer_size.unwrap_or(defaults.event_buffer_size),
            default_playlist_name: self
                .default_playlist_name
                .map(|name| name.trim().to_string())
                .unwrap_or(defaults.default_playlist_name),
            auto_connect: self.auto_connect.unwrap_or(defaults.auto_connect),
        };

        config.validate()?;

        Ok(config)
    }
}
