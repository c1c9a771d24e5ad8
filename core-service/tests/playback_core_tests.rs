//! End-to-end flows through `PlaybackCore` with an in-memory playlist store.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use core_library::db::create_test_pool;
use core_library::{PlaylistId, PlaylistRepository, SqlitePlaylistRepository};
use core_playback::{
    EngineCommand, EngineEvent, EngineEventSender, MediaId, PlaybackConnection, PlaybackEngine,
    QueueTitle,
};
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventStream, LibraryEvent};
use core_service::{PlaybackCore, SessionIntent, TransientMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

/// Engine that confirms binds and echoes queue replacements.
#[derive(Default)]
struct EchoEngine {
    events: Mutex<Option<EngineEventSender>>,
}

#[async_trait]
impl PlaybackEngine for EchoEngine {
    async fn connect(&self, events: EngineEventSender) -> BridgeResult<()> {
        let _ = events.send(EngineEvent::Connected);
        *self.events.lock() = Some(events);
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.events.lock().take();
        Ok(())
    }

    async fn send(&self, command: EngineCommand) -> BridgeResult<()> {
        if let EngineCommand::PlayQueue {
            items,
            title,
            start_index,
        } = command
        {
            if let Some(events) = self.events.lock().as_ref() {
                let _ = events.send(EngineEvent::QueueChanged {
                    items: items.iter().map(MediaId::encode).collect(),
                    current_index: start_index,
                    title: title.map(|t| t.to_string()),
                });
            }
        }
        Ok(())
    }
}

async fn core_with_repository() -> (PlaybackCore, Arc<SqlitePlaylistRepository>) {
    let pool = create_test_pool().await.unwrap();
    let repository = Arc::new(SqlitePlaylistRepository::new(pool));
    let core = PlaybackCore::new(
        SessionConfig::default(),
        Arc::new(EchoEngine::default()),
        repository.clone(),
    )
    .unwrap();
    (core, repository)
}

async fn load_album_queue(core: &PlaybackCore) {
    let connection = core.connection();
    let mut queue = connection.queue_state();
    connection.play_queue(
        vec![MediaId::track("one"), MediaId::track("two/2")],
        Some(QueueTitle::with_extra(MediaId::album("fake-id"), "Homework")),
        0,
    );
    timeout(WAIT, async {
        while let Some(state) = queue.next().await {
            if !state.is_empty() {
                return;
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_save_queue_persists_and_opens_playlist() {
    let (core, repository) = core_with_repository().await;
    let mut events = EventStream::new(core.event_bus().subscribe())
        .filter(|event| matches!(event, CoreEvent::Library(_)));
    let mut navigation = core.take_navigation_stream().unwrap();
    let mut messages = core.messages().subscribe();
    let session = core.orchestrator();

    load_album_queue(&core).await;
    session
        .handle(SessionIntent::SaveQueueAsPlaylist { name: None })
        .unwrap();

    let envelope = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
    let TransientMessage::SavedAsPlaylist(playlist) = envelope.message else {
        panic!("expected a saved message");
    };
    assert_eq!(playlist.name, "Homework");

    let stored = repository
        .find_by_id(&PlaylistId::from_string(&playlist.identifier()).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.items, vec!["track:one", "track:two%2F2"]);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(
        event,
        CoreEvent::Library(LibraryEvent::PlaylistCreated { item_count: 2, .. })
    ));

    core.messages().acknowledge(envelope.id);
    let request = timeout(WAIT, navigation.recv()).await.unwrap().unwrap();
    assert_eq!(request.resolved(), format!("playlists/{}", playlist.identifier()));

    core.shutdown().await;
}

#[tokio::test]
async fn test_queue_source_navigation_through_core() {
    let (core, _repository) = core_with_repository().await;
    let mut navigation = core.take_navigation_stream().unwrap();
    assert!(core.take_navigation_stream().is_none());

    load_album_queue(&core).await;
    core.orchestrator()
        .handle(SessionIntent::NavigateToQueueSource)
        .unwrap();

    let request = navigation.try_recv().unwrap();
    assert_eq!(request.resolved(), "albums/fake-id");
}

#[tokio::test]
async fn test_shutdown_closes_orchestrators() {
    let (core, repository) = core_with_repository().await;
    let mut messages = core.messages().subscribe();
    let session = core.orchestrator();

    core.shutdown().await;

    assert!(session.is_closed());
    assert!(session
        .handle(SessionIntent::SaveQueueAsPlaylist { name: None })
        .is_err());
    assert!(messages.try_recv().is_none());
    assert_eq!(repository.count().await.unwrap(), 0);
}
