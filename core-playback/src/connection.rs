//! # Playback Session Connection
//!
//! Sole bridge between the background playback engine and the rest of the
//! application.
//!
//! ## Overview
//!
//! A single background task owns the engine binding. It is the only writer
//! of the queue, status, position and now-playing cells; observers get hot
//! [`Subscription`]s that replay the current value and then every update in
//! order.
//!
//! ```text
//!  play()/seek_to()/...  ──Request──┐
//!                                   v
//!  PlaybackEngine ──EngineEvent──> session task ──publish──> ObservableCells
//!        ^                          │                             │
//!        └──────EngineCommand───────┘                      subscribers
//! ```
//!
//! Commands are fire-and-forget. Their effect shows up later on the
//! streams, never as a return value.
//!
//! ## Failure handling
//!
//! - Engine not connected: commands follow the configured
//!   [`PendingCommandPolicy`]; with `KeepLatestPerKind` only the newest
//!   command of each kind is kept and the survivors are replayed in
//!   submission order once the engine reports `Connected`.
//! - Unexpected disconnect: rebinding with exponential backoff per
//!   [`ReconnectPolicy`](core_runtime::config::ReconnectPolicy).
//! - Neither case surfaces as an error; only [`PlaybackStatus::connection`]
//!   changes.
//!
//! ## Usage
//!
//! ```ignore
//! let connection = PlaybackSessionConnection::start(engine, &config, event_bus)?;
//! let mut queue = connection.queue_state();
//! connection.play_queue(items, Some(title), 0);
//! while let Some(state) = queue.next().await {
//!     render(state);
//! }
//! ```

use crate::error::{PlaybackError, Result};
use crate::media_id::MediaId;
use crate::observable::{ObservableCell, Subscription};
use crate::queue::PlaybackQueueState;
use crate::queue_title::QueueTitle;
use crate::traits::{
    EngineCommand, EngineEvent, EngineEventReceiver, EngineEventSender, NowPlaying,
    PlaybackEngine, TransportState,
};
use core_runtime::config::{PendingCommandPolicy, ReconnectPolicy, SessionConfig};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Binding state between the connection and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Transport state plus connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub transport: TransportState,
    pub connection: ConnectionState,
}

impl PlaybackStatus {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}

/// Playback position within the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub position: Duration,
    /// Unknown while the item is still loading.
    pub duration: Option<Duration>,
}

/// Read side and command surface of the playback session.
///
/// Implemented by [`PlaybackSessionConnection`]; exists so consumers such
/// as the session orchestrator can be tested against a mock.
pub trait PlaybackConnection: Send + Sync {
    fn queue_state(&self) -> Subscription<PlaybackQueueState>;

    /// Snapshot of the latest queue state.
    fn current_queue(&self) -> PlaybackQueueState;

    fn playback_status(&self) -> Subscription<PlaybackStatus>;

    fn current_status(&self) -> PlaybackStatus;

    fn playback_position(&self) -> Subscription<PlaybackPosition>;

    fn now_playing(&self) -> Subscription<Option<NowPlaying>>;

    fn current_now_playing(&self) -> Option<NowPlaying>;

    fn play(&self);

    fn pause(&self);

    fn seek_to(&self, position_ms: u64);

    fn skip_to_next(&self);

    fn skip_to_previous(&self);

    /// Replace the queue. Empty `items` are ignored; an out-of-range
    /// `start_index` starts from the first item.
    fn play_queue(&self, items: Vec<MediaId>, title: Option<QueueTitle>, start_index: usize);
}

#[derive(Debug)]
enum Request {
    Connect,
    Command(EngineCommand),
}

#[derive(Clone)]
struct Cells {
    queue: ObservableCell<PlaybackQueueState>,
    status: ObservableCell<PlaybackStatus>,
    position: ObservableCell<PlaybackPosition>,
    now_playing: ObservableCell<Option<NowPlaying>>,
}

impl Cells {
    fn new() -> Self {
        Self {
            queue: ObservableCell::new(PlaybackQueueState::empty()),
            status: ObservableCell::new(PlaybackStatus::default()),
            position: ObservableCell::new(PlaybackPosition::default()),
            now_playing: ObservableCell::new(None),
        }
    }
}

/// Live connection to the background playback engine.
///
/// Dropping the connection stops its background task.
pub struct PlaybackSessionConnection {
    requests: mpsc::UnboundedSender<Request>,
    cells: Cells,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackSessionConnection {
    /// Spawn the session task on the current Tokio runtime.
    ///
    /// With `config.auto_connect` the engine binding starts immediately.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::RuntimeUnavailable`] outside a Tokio runtime.
    pub fn start(
        engine: Arc<dyn PlaybackEngine>,
        config: &SessionConfig,
        event_bus: Arc<EventBus>,
    ) -> Result<Self> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PlaybackError::RuntimeUnavailable)?;

        let cells = Cells::new();
        let shutdown = CancellationToken::new();
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            engine,
            cells: cells.clone(),
            event_bus,
            pending_policy: config.pending_command_policy,
            reconnect: config.reconnect.clone(),
            auto_connect: config.auto_connect,
            events_tx,
            pending: Vec::new(),
            connection: ConnectionState::Disconnected,
            engine_positions: EnginePositions::default(),
            attempts: 0,
            retry_at: None,
        };

        if config.auto_connect {
            // Receiver is alive until the task exits.
            let _ = requests.send(Request::Connect);
        }

        let handle = runtime.spawn(task.run(events_rx, requests_rx, shutdown.clone()));
        info!(
            policy = ?config.pending_command_policy,
            auto_connect = config.auto_connect,
            "Playback session started"
        );

        Ok(Self {
            requests,
            cells,
            shutdown,
            task: Mutex::new(Some(handle)),
        })
    }

    /// Bind to the engine if not already bound. Resets the reconnect budget.
    pub fn connect(&self) {
        self.submit(Request::Connect);
    }

    /// Stop the session task and disconnect from the engine.
    ///
    /// No reconnection is attempted afterwards. Commands issued after
    /// shutdown are discarded.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Playback session task ended abnormally");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn submit(&self, request: Request) {
        if self.requests.send(request).is_err() {
            debug!("Playback session stopped; request discarded");
        }
    }

    fn command(&self, command: EngineCommand) {
        self.submit(Request::Command(command));
    }
}

impl PlaybackConnection for PlaybackSessionConnection {
    fn queue_state(&self) -> Subscription<PlaybackQueueState> {
        self.cells.queue.subscribe()
    }

    fn current_queue(&self) -> PlaybackQueueState {
        self.cells.queue.get()
    }

    fn playback_status(&self) -> Subscription<PlaybackStatus> {
        self.cells.status.subscribe()
    }

    fn current_status(&self) -> PlaybackStatus {
        self.cells.status.get()
    }

    fn playback_position(&self) -> Subscription<PlaybackPosition> {
        self.cells.position.subscribe()
    }

    fn now_playing(&self) -> Subscription<Option<NowPlaying>> {
        self.cells.now_playing.subscribe()
    }

    fn current_now_playing(&self) -> Option<NowPlaying> {
        self.cells.now_playing.get()
    }

    fn play(&self) {
        self.command(EngineCommand::Play);
    }

    fn pause(&self) {
        self.command(EngineCommand::Pause);
    }

    fn seek_to(&self, position_ms: u64) {
        self.command(EngineCommand::SeekTo { position_ms });
    }

    fn skip_to_next(&self) {
        self.command(EngineCommand::SkipToNext);
    }

    fn skip_to_previous(&self) {
        self.command(EngineCommand::SkipToPrevious);
    }

    fn play_queue(&self, items: Vec<MediaId>, title: Option<QueueTitle>, start_index: usize) {
        if items.is_empty() {
            debug!("Ignoring play_queue with no items");
            return;
        }
        let start_index = if start_index < items.len() {
            start_index
        } else {
            debug!(start_index, len = items.len(), "Start index out of range; using 0");
            0
        };
        self.command(EngineCommand::PlayQueue {
            items,
            title,
            start_index,
        });
    }
}

impl Drop for PlaybackSessionConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// State owned by the background task.
struct SessionTask {
    engine: Arc<dyn PlaybackEngine>,
    cells: Cells,
    event_bus: Arc<EventBus>,
    pending_policy: PendingCommandPolicy,
    reconnect: ReconnectPolicy,
    auto_connect: bool,
    events_tx: EngineEventSender,
    /// Deferred commands in submission order, at most one per kind.
    pending: Vec<EngineCommand>,
    connection: ConnectionState,
    /// Maps the engine's indexes onto the published queue.
    engine_positions: EnginePositions,
    /// Reconnect attempts since the last successful bind.
    attempts: u32,
    retry_at: Option<Instant>,
}

impl SessionTask {
    async fn run(
        mut self,
        mut events: EngineEventReceiver,
        mut requests: mpsc::UnboundedReceiver<Request>,
        shutdown: CancellationToken,
    ) {
        loop {
            let retry_at = self.retry_at;
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                Some(event) = events.recv() => self.apply_event(event).await,

                request = requests.recv() => match request {
                    Some(Request::Connect) => {
                        self.attempts = 0;
                        self.retry_at = None;
                        self.connect().await;
                    }
                    Some(Request::Command(command)) => self.handle_command(command).await,
                    None => break,
                },

                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)),
                    if retry_at.is_some() =>
                {
                    self.retry_at = None;
                    self.connect().await;
                }
            }
        }

        if self.connection != ConnectionState::Disconnected {
            if let Err(e) = self.engine.disconnect().await {
                debug!(error = %e, "Engine disconnect failed during shutdown");
            }
        }
        self.set_connection(ConnectionState::Disconnected);
        info!("Playback session stopped");
    }

    #[instrument(skip(self), fields(attempt = self.attempts))]
    async fn connect(&mut self) {
        if self.connection != ConnectionState::Disconnected {
            debug!(state = ?self.connection, "Engine binding already in progress");
            return;
        }

        self.set_connection(ConnectionState::Connecting);
        match self.engine.connect(self.events_tx.clone()).await {
            Ok(()) => debug!("Engine bind requested; waiting for confirmation"),
            Err(e) => {
                warn!(error = %e, "Failed to bind to playback engine");
                self.set_connection(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    /// Returns whether a retry was scheduled.
    fn schedule_reconnect(&mut self) -> bool {
        if !self.reconnect.enabled || self.attempts >= self.reconnect.max_attempts {
            if self.reconnect.enabled {
                warn!(
                    attempts = self.attempts,
                    "Giving up on playback engine until the next explicit connect"
                );
            }
            return false;
        }

        self.attempts += 1;
        let delay = self.reconnect.delay_for_attempt(self.attempts);
        self.retry_at = Some(Instant::now() + delay);
        debug!(attempt = self.attempts, ?delay, "Reconnect scheduled");
        true
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        if self.connection != ConnectionState::Connected {
            self.defer(command);
            if self.auto_connect
                && self.connection == ConnectionState::Disconnected
                && self.retry_at.is_none()
            {
                self.attempts = 0;
                self.connect().await;
            }
            return;
        }

        self.deliver(command).await;
    }

    /// Returns `false` when the engine turned out to be unreachable; the
    /// command is deferred in that case.
    async fn deliver(&mut self, command: EngineCommand) -> bool {
        let kind = command.kind();
        match self.engine.send(command.clone()).await {
            Ok(()) => {
                debug!(command = kind.as_str(), "Command delivered");
                true
            }
            Err(e) if e.is_unavailable() => {
                warn!(command = kind.as_str(), error = %e, "Engine unreachable; deferring command");
                self.defer(command);
                self.set_connection(ConnectionState::Disconnected);
                let will_retry = self.schedule_reconnect();
                self.emit(PlaybackEvent::EngineDisconnected { will_retry });
                false
            }
            Err(e) => {
                warn!(command = kind.as_str(), error = %e, "Engine rejected command");
                self.emit(PlaybackEvent::Error {
                    message: e.to_string(),
                    recoverable: true,
                });
                true
            }
        }
    }

    fn defer(&mut self, command: EngineCommand) {
        let kind = command.kind();
        match self.pending_policy {
            PendingCommandPolicy::KeepLatestPerKind => {
                self.pending.retain(|pending| pending.kind() != kind);
                self.pending.push(command);
                debug!(command = kind.as_str(), pending = self.pending.len(), "Command deferred");
                self.emit(PlaybackEvent::CommandDeferred {
                    command: kind.as_str().to_string(),
                });
            }
            PendingCommandPolicy::Drop => {
                debug!(command = kind.as_str(), "Engine unavailable; command dropped");
            }
        }
    }

    async fn flush_pending(&mut self) {
        let mut queued = std::mem::take(&mut self.pending).into_iter();
        if queued.len() > 0 {
            info!(count = queued.len(), "Replaying deferred commands");
        }

        while let Some(command) = queued.next() {
            if !self.deliver(command).await {
                // Engine dropped mid-replay; keep the rest in order.
                for rest in queued.by_ref() {
                    self.defer(rest);
                }
            }
        }
    }

    async fn apply_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Connected => {
                info!("Playback engine connected");
                self.attempts = 0;
                self.retry_at = None;
                self.set_connection(ConnectionState::Connected);
                self.emit(PlaybackEvent::EngineConnected);
                self.flush_pending().await;
            }
            EngineEvent::Disconnected => {
                if self.connection == ConnectionState::Disconnected {
                    return;
                }
                self.set_connection(ConnectionState::Disconnected);
                let will_retry = self.schedule_reconnect();
                warn!(will_retry, "Playback engine disconnected");
                self.emit(PlaybackEvent::EngineDisconnected { will_retry });
            }
            EngineEvent::QueueChanged {
                items,
                current_index,
                title,
            } => {
                let (state, positions) = decode_queue(&items, current_index, title.as_deref());
                self.engine_positions = positions;
                debug!(
                    items = state.len(),
                    current_index = state.current_index(),
                    "Queue replaced"
                );
                self.emit(PlaybackEvent::QueueReplaced {
                    source: state.source_media_id().map(MediaId::encode),
                    item_count: state.len(),
                    current_index: state.current_index(),
                });
                self.cells.queue.publish(state);
            }
            EngineEvent::CurrentIndexChanged(engine_index) => {
                let index = self.engine_positions.translate(engine_index);
                let state = self.cells.queue.get().with_current_index(index);
                self.cells.queue.publish(state);
            }
            EngineEvent::TransportChanged(transport) => {
                self.cells.status.update(|status| status.transport = transport);
                self.emit(PlaybackEvent::TransportChanged {
                    state: transport.as_str().to_string(),
                });
            }
            EngineEvent::PositionChanged { position, duration } => {
                self.cells
                    .position
                    .publish(PlaybackPosition { position, duration });
            }
            EngineEvent::NowPlayingChanged(now_playing) => {
                self.cells.now_playing.publish(now_playing);
            }
            EngineEvent::Error { message } => {
                warn!(%message, "Playback engine reported an error");
                self.emit(PlaybackEvent::Error {
                    message,
                    recoverable: true,
                });
            }
        }
    }

    fn set_connection(&mut self, connection: ConnectionState) {
        if self.connection == connection {
            return;
        }
        self.connection = connection;
        self.cells
            .status
            .update(|status| status.connection = connection);
    }

    fn emit(&self, event: PlaybackEvent) {
        self.event_bus.emit(CoreEvent::Playback(event)).ok();
    }
}

/// Engine-side positions of the items that survived decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EnginePositions {
    kept: Vec<usize>,
}

impl EnginePositions {
    /// Queue index for an engine index: the same item, or the next
    /// surviving one when the engine's item was skipped. Not clamped.
    fn translate(&self, engine_index: usize) -> usize {
        self.kept.partition_point(|&position| position < engine_index)
    }
}

/// Turn the engine's wire-level queue into a valid state.
///
/// Undecodable items are skipped; the current index is moved to the same
/// item (or the next surviving one) and clamped into range.
fn decode_queue(
    items: &[String],
    current_index: usize,
    title: Option<&str>,
) -> (PlaybackQueueState, EnginePositions) {
    let mut decoded = Vec::with_capacity(items.len());
    let mut positions = EnginePositions::default();
    for (position, raw) in items.iter().enumerate() {
        if let Some(id) = MediaId::decode_lossy(raw) {
            positions.kept.push(position);
            decoded.push(id);
        }
    }

    let index = positions.translate(current_index);
    let title = title.and_then(QueueTitle::parse_or_untitled);
    (PlaybackQueueState::clamped(decoded, index, title), positions)
}
