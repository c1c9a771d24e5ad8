//! Core service façade and bootstrap helpers.
//!
//! This crate wires the playback session pieces together for a host
//! application. [`PlaybackCore`] is built from a [`SessionConfig`], the
//! host's [`PlaybackEngine`] and a [`PlaylistRepository`]; everything else
//! (connection, persistence, message hub, navigation channel) is created
//! here and handed out explicitly, so there is no process-wide container.
//!
//! ```ignore
//! let core = PlaybackCore::with_database(config, engine, DatabaseConfig::new(path)).await?;
//! let mut navigation = core.take_navigation_stream().expect("first call");
//! let mut messages = core.messages().subscribe();
//!
//! let session = core.orchestrator();
//! session.handle(SessionIntent::SaveQueueAsPlaylist { name: None })?;
//! ```

pub mod error;
pub mod messages;
pub mod navigation;
pub mod session;

pub use error::{Result, ServiceError};
pub use messages::{MessageEnvelope, MessageHub, MessageId, MessageStream, TransientMessage};
pub use navigation::{NavigationRequest, NavigationStream, Navigator, Screen, SearchBackend};
pub use session::{SessionCommandOrchestrator, SessionIntent};

use core_library::db::{create_pool, DatabaseConfig};
use core_library::{PlaylistRepository, SqlitePlaylistRepository};
use core_playback::{
    PlaybackConnection, PlaybackEngine, PlaybackSessionConnection, PlaylistQueuePersistence,
    QueuePersistence,
};
use core_runtime::config::SessionConfig;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Explicit dependency container for one playback session.
pub struct PlaybackCore {
    config: SessionConfig,
    event_bus: Arc<EventBus>,
    connection: Arc<PlaybackSessionConnection>,
    persistence: Arc<dyn QueuePersistence>,
    messages: Arc<MessageHub>,
    navigator: Navigator,
    navigation: Mutex<Option<NavigationStream>>,
    scope: CancellationToken,
}

impl PlaybackCore {
    /// Build the core and start the engine connection.
    ///
    /// Must be called inside a Tokio runtime.
    #[instrument(skip_all)]
    pub fn new(
        config: SessionConfig,
        engine: Arc<dyn PlaybackEngine>,
        repository: Arc<dyn PlaylistRepository>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let connection = Arc::new(PlaybackSessionConnection::start(
            engine,
            &config,
            Arc::clone(&event_bus),
        )?);
        let persistence: Arc<dyn QueuePersistence> = Arc::new(PlaylistQueuePersistence::new(
            repository,
            &config,
            Arc::clone(&event_bus),
        ));
        let messages = Arc::new(MessageHub::new(Arc::clone(&event_bus)));
        let (navigator, navigation) = navigation::channel(Arc::clone(&event_bus));

        info!("Playback core initialized");

        Ok(Self {
            config,
            event_bus,
            connection,
            persistence,
            messages,
            navigator,
            navigation: Mutex::new(Some(navigation)),
            scope: CancellationToken::new(),
        })
    }

    /// Like [`new`](Self::new), storing playlists in the SQLite database
    /// described by `database`.
    pub async fn with_database(
        config: SessionConfig,
        engine: Arc<dyn PlaybackEngine>,
        database: DatabaseConfig,
    ) -> Result<Self> {
        let pool = create_pool(database).await?;
        let repository = Arc::new(SqlitePlaylistRepository::new(pool));
        Self::new(config, engine, repository)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn connection(&self) -> Arc<PlaybackSessionConnection> {
        Arc::clone(&self.connection)
    }

    pub fn persistence(&self) -> Arc<dyn QueuePersistence> {
        Arc::clone(&self.persistence)
    }

    pub fn messages(&self) -> Arc<MessageHub> {
        Arc::clone(&self.messages)
    }

    pub fn navigator(&self) -> Navigator {
        self.navigator.clone()
    }

    /// The single navigation consumer. `None` after the first call.
    pub fn take_navigation_stream(&self) -> Option<NavigationStream> {
        self.navigation.lock().take()
    }

    /// New orchestrator for a screen. Its scope is a child of the core's,
    /// so [`shutdown`](Self::shutdown) closes every orchestrator.
    pub fn orchestrator(&self) -> SessionCommandOrchestrator {
        let connection: Arc<dyn PlaybackConnection> = self.connection.clone();
        SessionCommandOrchestrator::new(
            connection,
            Arc::clone(&self.persistence),
            Arc::clone(&self.messages),
            self.navigator.clone(),
            self.scope.child_token(),
        )
    }

    /// Close every orchestrator scope and stop the engine connection.
    pub async fn shutdown(&self) {
        self.scope.cancel();
        self.connection.shutdown().await;
        info!("Playback core shut down");
    }
}
