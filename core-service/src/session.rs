//! # Session Command Orchestrator
//!
//! Turns user intents from the now-playing screen into exactly one outcome
//! each: a transient message, a navigation request, or nothing.
//!
//! | Intent | Outcome |
//! |---|---|
//! | [`SessionIntent::SaveQueueAsPlaylist`] | "saved" message, then playlist screen once that message is acknowledged; error message on failure |
//! | [`SessionIntent::NavigateToQueueSource`] | screen of the queue's source, or nothing |
//! | [`SessionIntent::TitleClick`] | search scoped to albums |
//! | [`SessionIntent::ArtistClick`] | search scoped to albums and artists |
//!
//! All work is tied to a scope token. [`SessionCommandOrchestrator::close`]
//! (or dropping the orchestrator) cancels in-flight saves and pending
//! acknowledgement waits; nothing is emitted after that.

use crate::error::{Result, ServiceError};
use crate::messages::{MessageHub, MessageId, TransientMessage};
use crate::navigation::{Navigator, Screen, SearchBackend};
use core_playback::{PersistenceError, PlaybackConnection, QueuePersistence};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// User intents handled by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIntent {
    /// Save the current queue. `name` overrides the derived playlist name.
    SaveQueueAsPlaylist { name: Option<String> },
    NavigateToQueueSource,
    TitleClick,
    ArtistClick,
}

struct Shared {
    connection: Arc<dyn PlaybackConnection>,
    persistence: Arc<dyn QueuePersistence>,
    messages: Arc<MessageHub>,
    navigator: Navigator,
    scope: CancellationToken,
}

pub struct SessionCommandOrchestrator {
    shared: Arc<Shared>,
}

impl SessionCommandOrchestrator {
    pub fn new(
        connection: Arc<dyn PlaybackConnection>,
        persistence: Arc<dyn QueuePersistence>,
        messages: Arc<MessageHub>,
        navigator: Navigator,
        scope: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                connection,
                persistence,
                messages,
                navigator,
                scope,
            }),
        }
    }

    /// Dispatch an intent without waiting for its outcome.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::ScopeClosed`] after [`close`](Self::close)
    /// - [`ServiceError::RuntimeUnavailable`] when a save is requested
    ///   outside a Tokio runtime
    pub fn handle(&self, intent: SessionIntent) -> Result<()> {
        if self.is_closed() {
            return Err(ServiceError::ScopeClosed);
        }

        debug!(?intent, "Handling session intent");
        match intent {
            SessionIntent::SaveQueueAsPlaylist { name } => {
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|_| ServiceError::RuntimeUnavailable)?;
                let shared = Arc::clone(&self.shared);
                runtime.spawn(async move {
                    shared.save_queue_as_playlist(name).await;
                });
            }
            SessionIntent::NavigateToQueueSource => {
                self.navigate_to_queue_source();
            }
            SessionIntent::TitleClick => {
                self.on_title_click();
            }
            SessionIntent::ArtistClick => {
                self.on_artist_click();
            }
        }
        Ok(())
    }

    /// Save the current queue and wait for the outcome message.
    ///
    /// Returns the id of the message shown, or `None` if the scope closed
    /// first. On success, acknowledging that message opens the playlist.
    pub async fn save_queue_as_playlist(&self, name: Option<String>) -> Option<MessageId> {
        self.shared.save_queue_as_playlist(name).await
    }

    /// Returns whether a navigation request was issued.
    pub fn navigate_to_queue_source(&self) -> bool {
        let queue = self.shared.connection.current_queue();
        let Some(source) = queue.source_media_id() else {
            debug!("Queue has no source; nothing to open");
            return false;
        };
        let Some(screen) = Screen::for_source(source) else {
            debug!(kind = ?source.kind(), "Queue source has no screen");
            return false;
        };
        self.shared.navigate(&screen)
    }

    /// Search albums for the now-playing album, falling back to its title.
    pub fn on_title_click(&self) -> bool {
        let query = self
            .shared
            .connection
            .current_now_playing()
            .and_then(|now| now.album.or(now.title))
            .unwrap_or_default();
        self.shared.navigate(&Screen::Search {
            query,
            backends: vec![SearchBackend::Albums],
        })
    }

    /// Search albums and artists for the now-playing artist.
    pub fn on_artist_click(&self) -> bool {
        let query = self
            .shared
            .connection
            .current_now_playing()
            .and_then(|now| now.artist)
            .unwrap_or_default();
        self.shared.navigate(&Screen::Search {
            query,
            backends: vec![SearchBackend::Albums, SearchBackend::Artists],
        })
    }

    /// Cancel all in-flight work. Idempotent.
    pub fn close(&self) {
        if !self.shared.scope.is_cancelled() {
            info!("Closing session scope");
            self.shared.scope.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.scope.is_cancelled()
    }
}

impl Drop for SessionCommandOrchestrator {
    fn drop(&mut self) {
        self.shared.scope.cancel();
    }
}

impl Shared {
    #[instrument(skip(self, name))]
    async fn save_queue_as_playlist(self: &Arc<Self>, name: Option<String>) -> Option<MessageId> {
        if self.scope.is_cancelled() {
            return None;
        }

        let queue = self.connection.current_queue();
        if queue.is_empty() {
            return Some(self.show_failure(PersistenceError::EmptyQueue));
        }

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => {
                debug!("Save cancelled before completion");
                return None;
            }
            result = self.persistence.create_playlist(&queue, name) => result,
        };

        if self.scope.is_cancelled() {
            debug!("Scope closed while saving; outcome not shown");
            return None;
        }

        match result {
            Ok(playlist) => {
                let playlist_id = playlist.identifier();
                let message_id = self.messages.show(TransientMessage::SavedAsPlaylist(playlist));
                self.open_playlist_on_acknowledgement(message_id, playlist_id);
                Some(message_id)
            }
            Err(e) => Some(self.show_failure(e)),
        }
    }

    fn show_failure(&self, error: PersistenceError) -> MessageId {
        warn!(error = %error, "Saving queue as playlist failed");
        self.messages.show(TransientMessage::Error(error.user_message()))
    }

    fn open_playlist_on_acknowledgement(self: &Arc<Self>, message_id: MessageId, playlist_id: String) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No runtime to await acknowledgement; playlist will not be opened");
                return;
            }
        };

        let shared = Arc::clone(self);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = shared.scope.cancelled() => {
                    debug!(%message_id, "Scope closed before acknowledgement");
                }
                _ = shared.messages.wait_for_acknowledgement(message_id) => {
                    shared.navigate(&Screen::PlaylistDetail { playlist_id });
                }
            }
        });
    }

    fn navigate(&self, screen: &Screen) -> bool {
        if self.scope.is_cancelled() {
            debug!("Scope closed; navigation skipped");
            return false;
        }
        self.navigator.navigate_to(screen)
    }
}
