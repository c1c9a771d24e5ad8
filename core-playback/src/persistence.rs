//! # Queue Persistence
//!
//! Saves a snapshot of the playback queue as a standalone playlist.
//!
//! The snapshot is taken when [`QueuePersistence::create_playlist`] is
//! called; later queue changes do not affect the stored playlist. Calls are
//! not idempotent: saving the same queue twice creates two playlists.

use crate::media_id::MediaId;
use crate::queue::PlaybackQueueState;
use async_trait::async_trait;
use core_library::error::LibraryError;
use core_library::models::Playlist;
use core_library::repositories::PlaylistRepository;
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Failed to store playlist: {0}")]
    Storage(#[from] LibraryError),
}

impl PersistenceError {
    /// Text shown to the user when saving fails.
    pub fn user_message(&self) -> String {
        match self {
            PersistenceError::EmptyQueue => "Queue is empty".to_string(),
            PersistenceError::Storage(e) => format!("Couldn't save playlist: {}", e.user_message()),
        }
    }
}

/// Turns queue snapshots into durable playlists.
#[async_trait]
pub trait QueuePersistence: Send + Sync {
    /// Persist `queue` as a new playlist.
    ///
    /// The name is `name` when it is non-blank, otherwise derived from the
    /// queue title, otherwise the configured default. The returned future
    /// resolves exactly once. Dropping it before it resolves leaves no
    /// playlist behind.
    async fn create_playlist(
        &self,
        queue: &PlaybackQueueState,
        name: Option<String>,
    ) -> Result<Playlist, PersistenceError>;
}

/// [`QueuePersistence`] backed by a [`PlaylistRepository`].
pub struct PlaylistQueuePersistence {
    repository: Arc<dyn PlaylistRepository>,
    default_name: String,
    event_bus: Arc<EventBus>,
}

impl PlaylistQueuePersistence {
    pub fn new(
        repository: Arc<dyn PlaylistRepository>,
        config: &SessionConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repository,
            default_name: config.default_playlist_name.clone(),
            event_bus,
        }
    }

    fn playlist_name(&self, queue: &PlaybackQueueState, name: Option<String>) -> String {
        name.map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| queue.title().map(|title| title.display_name()))
            .unwrap_or_else(|| self.default_name.clone())
    }
}

#[async_trait]
impl QueuePersistence for PlaylistQueuePersistence {
    #[instrument(skip(self, queue, name), fields(items = queue.len()))]
    async fn create_playlist(
        &self,
        queue: &PlaybackQueueState,
        name: Option<String>,
    ) -> Result<Playlist, PersistenceError> {
        if queue.is_empty() {
            return Err(PersistenceError::EmptyQueue);
        }

        let name = self.playlist_name(queue, name);
        let items: Vec<String> = queue.items().iter().map(MediaId::encode).collect();

        let playlist = self
            .repository
            .insert_playlist(&name, &items)
            .await
            .map_err(|e| {
                warn!(error = %e, "Saving queue as playlist failed");
                PersistenceError::from(e)
            })?;

        info!(playlist_id = %playlist.id, "Queue saved as playlist");
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
                playlist_id: playlist.identifier(),
                name: playlist.name.clone(),
                item_count: playlist.items.len(),
            }))
            .ok();

        Ok(playlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue_title::QueueTitle;
    use core_library::models::PlaylistId;
    use mockall::mock;

    mock! {
        pub Repo {}

        #[async_trait]
        impl PlaylistRepository for Repo {
            async fn insert_playlist(&self, name: &str, items: &[String]) -> core_library::Result<Playlist>;
            async fn find_by_id(&self, id: &PlaylistId) -> core_library::Result<Option<Playlist>>;
            async fn item_ids(&self, id: &PlaylistId) -> core_library::Result<Vec<String>>;
            async fn delete(&self, id: &PlaylistId) -> core_library::Result<bool>;
            async fn count(&self) -> core_library::Result<i64>;
        }
    }

    fn queue(title: Option<QueueTitle>) -> PlaybackQueueState {
        PlaybackQueueState::new(vec![MediaId::track("a"), MediaId::track("b c")], 0, title)
            .unwrap()
    }

    fn persistence(repo: MockRepo, bus: Arc<EventBus>) -> PlaylistQueuePersistence {
        PlaylistQueuePersistence::new(Arc::new(repo), &SessionConfig::default(), bus)
    }

    fn echo_insert(repo: &mut MockRepo, expected_name: &'static str) {
        repo.expect_insert_playlist()
            .withf(move |name, _| name == expected_name)
            .times(1)
            .returning(|name, items| Ok(Playlist::new(name, items.to_vec(), 0)));
    }

    #[tokio::test]
    async fn test_explicit_name_wins() {
        let mut repo = MockRepo::new();
        echo_insert(&mut repo, "Gym");

        let title = QueueTitle::new(MediaId::album("x"));
        let playlist = persistence(repo, Arc::new(EventBus::default()))
            .create_playlist(&queue(Some(title)), Some("  Gym ".to_string()))
            .await
            .unwrap();

        assert_eq!(playlist.name, "Gym");
        assert_eq!(playlist.items, vec!["track:a".to_string(), "track:b%20c".to_string()]);
    }

    #[tokio::test]
    async fn test_name_from_title_then_default() {
        let mut repo = MockRepo::new();
        echo_insert(&mut repo, "Late night");
        let title = QueueTitle::with_extra(MediaId::search("lofi"), "Late night");
        persistence(repo, Arc::new(EventBus::default()))
            .create_playlist(&queue(Some(title)), Some("   ".to_string()))
            .await
            .unwrap();

        let mut repo = MockRepo::new();
        echo_insert(&mut repo, "Queue");
        persistence(repo, Arc::new(EventBus::default()))
            .create_playlist(&queue(None), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_queue_skips_storage() {
        let mut repo = MockRepo::new();
        repo.expect_insert_playlist().times(0);

        let err = persistence(repo, Arc::new(EventBus::default()))
            .create_playlist(&PlaybackQueueState::empty(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::EmptyQueue));
        assert_eq!(err.user_message(), "Queue is empty");
    }

    #[tokio::test]
    async fn test_storage_failure_is_described() {
        let mut repo = MockRepo::new();
        repo.expect_insert_playlist()
            .times(1)
            .returning(|_, _| Err(LibraryError::Migration("locked".to_string())));

        let err = persistence(repo, Arc::new(EventBus::default()))
            .create_playlist(&queue(None), None)
            .await
            .unwrap_err();

        assert_eq!(
            err.user_message(),
            "Couldn't save playlist: Library storage is unavailable"
        );
    }

    #[tokio::test]
    async fn test_emits_playlist_created() {
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();

        let mut repo = MockRepo::new();
        echo_insert(&mut repo, "Queue");
        let playlist = persistence(repo, Arc::clone(&bus))
            .create_playlist(&queue(None), None)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Library(LibraryEvent::PlaylistCreated {
                playlist_id: playlist.identifier(),
                name: "Queue".to_string(),
                item_count: 2,
            })
        );
    }

    #[tokio::test]
    async fn test_repeated_saves_are_not_deduplicated() {
        let mut repo = MockRepo::new();
        repo.expect_insert_playlist()
            .withf(|name, _| name == "Queue")
            .times(2)
            .returning(|name, items| Ok(Playlist::new(name, items.to_vec(), 0)));

        let persistence = persistence(repo, Arc::new(EventBus::default()));
        let snapshot = queue(None);
        let first = persistence.create_playlist(&snapshot, None).await.unwrap();
        let second = persistence.create_playlist(&snapshot, None).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
