//! # Navigation
//!
//! Route requests handed to the host's navigation graph.
//!
//! The core never inspects the graph. It only builds
//! `(route template, arguments)` pairs and pushes them, in order, to the one
//! [`NavigationStream`] owned by the host.

use core_playback::{MediaId, MediaType};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_runtime::logging::redact_query;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const SEARCH_ROUTE: &str = "search?q={query}&backends={backends}";
pub const ALBUM_DETAIL_ROUTE: &str = "albums/{albumId}";
pub const ARTIST_DETAIL_ROUTE: &str = "artists/{artistId}";
pub const PLAYLIST_DETAIL_ROUTE: &str = "playlists/{playlistId}";

/// Separator between backend tokens in the search route.
pub const BACKEND_SEPARATOR: &str = ",";

/// A route template plus the arguments for its `{placeholders}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub route: String,
    pub arguments: Vec<String>,
}

impl NavigationRequest {
    pub fn new(route: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            route: route.into(),
            arguments,
        }
    }

    /// Route with each placeholder replaced by the next argument,
    /// percent-encoded. Placeholders without an argument become empty.
    ///
    /// ```
    /// use core_service::navigation::NavigationRequest;
    ///
    /// let request = NavigationRequest::new("playlists/{playlistId}", vec!["42".into()]);
    /// assert_eq!(request.resolved(), "playlists/42");
    /// ```
    pub fn resolved(&self) -> String {
        let mut resolved = String::with_capacity(self.route.len());
        let mut arguments = self.arguments.iter();
        let mut rest = self.route.as_str();

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            resolved.push_str(&rest[..open]);
            if let Some(argument) = arguments.next() {
                resolved.push_str(&urlencoding::encode(argument));
            }
            rest = &rest[open + close + 1..];
        }

        resolved.push_str(rest);
        resolved
    }
}

impl fmt::Display for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolved())
    }
}

/// Search categories understood by the search screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    Audios,
    Albums,
    Artists,
}

impl SearchBackend {
    pub const ALL: [SearchBackend; 3] = [
        SearchBackend::Audios,
        SearchBackend::Albums,
        SearchBackend::Artists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBackend::Audios => "audios",
            SearchBackend::Albums => "albums",
            SearchBackend::Artists => "artists",
        }
    }
}

/// Screens the session core can send the user to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Search {
        query: String,
        backends: Vec<SearchBackend>,
    },
    AlbumDetail { album_id: String },
    ArtistDetail { artist_id: String },
    PlaylistDetail { playlist_id: String },
}

impl Screen {
    /// Screen showing the origin of a queue. Single tracks have no screen
    /// of their own.
    pub fn for_source(source: &MediaId) -> Option<Screen> {
        let value = source.value().to_string();
        match source.kind() {
            MediaType::Album => Some(Screen::AlbumDetail { album_id: value }),
            MediaType::Artist => Some(Screen::ArtistDetail { artist_id: value }),
            MediaType::Playlist => Some(Screen::PlaylistDetail { playlist_id: value }),
            MediaType::SearchQuery => Some(Screen::Search {
                query: value,
                backends: SearchBackend::ALL.to_vec(),
            }),
            MediaType::Track => None,
        }
    }

    pub fn request(&self) -> NavigationRequest {
        match self {
            Screen::Search { query, backends } => {
                let backends = backends
                    .iter()
                    .map(SearchBackend::as_str)
                    .collect::<Vec<_>>()
                    .join(BACKEND_SEPARATOR);
                NavigationRequest::new(SEARCH_ROUTE, vec![query.clone(), backends])
            }
            Screen::AlbumDetail { album_id } => {
                NavigationRequest::new(ALBUM_DETAIL_ROUTE, vec![album_id.clone()])
            }
            Screen::ArtistDetail { artist_id } => {
                NavigationRequest::new(ARTIST_DETAIL_ROUTE, vec![artist_id.clone()])
            }
            Screen::PlaylistDetail { playlist_id } => {
                NavigationRequest::new(PLAYLIST_DETAIL_ROUTE, vec![playlist_id.clone()])
            }
        }
    }
}

/// Create a connected navigator and its single consumer.
pub fn channel(event_bus: Arc<EventBus>) -> (Navigator, NavigationStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Navigator { sender, event_bus }, NavigationStream { receiver })
}

/// Cloneable sending side. Requests are delivered in the order they are
/// issued across all clones.
#[derive(Clone)]
pub struct Navigator {
    sender: mpsc::UnboundedSender<NavigationRequest>,
    event_bus: Arc<EventBus>,
}

impl Navigator {
    /// Returns `false` when the navigation stream has been dropped.
    pub fn navigate(&self, request: NavigationRequest) -> bool {
        let resolved = request.resolved();
        if self.sender.send(request).is_err() {
            debug!(route = %resolved, "No navigation consumer; request dropped");
            return false;
        }

        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::NavigationRequested {
                route: resolved,
            }))
            .ok();
        true
    }

    pub fn navigate_to(&self, screen: &Screen) -> bool {
        match screen {
            Screen::Search { query, backends } => {
                info!(query = %redact_query(query), ?backends, "Navigating to search")
            }
            other => info!(screen = ?other, "Navigating"),
        }
        self.navigate(screen.request())
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Receiving side of the navigation channel.
#[derive(Debug)]
pub struct NavigationStream {
    receiver: mpsc::UnboundedReceiver<NavigationRequest>,
}

impl NavigationStream {
    /// Next request, or `None` once every [`Navigator`] is dropped.
    pub async fn recv(&mut self) -> Option<NavigationRequest> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NavigationRequest> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fills_placeholders_in_order() {
        let request = Screen::Search {
            query: "lofi beats".to_string(),
            backends: vec![SearchBackend::Albums, SearchBackend::Artists],
        }
        .request();

        assert_eq!(request.route, SEARCH_ROUTE);
        assert_eq!(request.arguments, vec!["lofi beats", "albums,artists"]);
        assert_eq!(
            request.resolved(),
            "search?q=lofi%20beats&backends=albums%2Cartists"
        );
    }

    #[test]
    fn test_resolve_missing_and_extra_arguments() {
        let request = NavigationRequest::new("a/{x}/b/{y}", vec!["1".into()]);
        assert_eq!(request.resolved(), "a/1/b/");

        let request = NavigationRequest::new("plain", vec!["ignored".into()]);
        assert_eq!(request.resolved(), "plain");

        let request = NavigationRequest::new("open/{never-closed", vec!["x".into()]);
        assert_eq!(request.resolved(), "open/{never-closed");
    }

    #[test]
    fn test_screen_for_source() {
        assert_eq!(
            Screen::for_source(&MediaId::album("fake-id")),
            Some(Screen::AlbumDetail {
                album_id: "fake-id".to_string()
            })
        );
        assert_eq!(
            Screen::for_source(&MediaId::playlist("p1")).unwrap().request().resolved(),
            "playlists/p1"
        );
        assert!(matches!(
            Screen::for_source(&MediaId::search("daft punk")),
            Some(Screen::Search { query, .. }) if query == "daft punk"
        ));
        assert_eq!(Screen::for_source(&MediaId::track("t")), None);
    }

    #[tokio::test]
    async fn test_requests_arrive_in_order_and_are_announced() {
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let (navigator, mut stream) = channel(Arc::clone(&bus));
        let other = navigator.clone();

        assert!(navigator.navigate_to(&Screen::ArtistDetail {
            artist_id: "a".to_string()
        }));
        assert!(other.navigate_to(&Screen::AlbumDetail {
            album_id: "b".to_string()
        }));

        assert_eq!(stream.recv().await.unwrap().resolved(), "artists/a");
        assert_eq!(stream.recv().await.unwrap().resolved(), "albums/b");
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::NavigationRequested {
                route: "artists/a".to_string()
            })
        );
    }

    #[test]
    fn test_navigate_without_consumer() {
        let (navigator, stream) = channel(Arc::new(EventBus::default()));
        drop(stream);
        assert!(!navigator.navigate(NavigationRequest::new("x", Vec::new())));
    }
}
