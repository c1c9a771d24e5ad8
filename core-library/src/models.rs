//! Persisted library records

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub Uuid);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A playlist saved from a snapshot of the playback queue.
///
/// `items` holds encoded media identifiers in queue order. The library does
/// not interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub items: Vec<String>,
    /// Unix timestamp (seconds)
    pub created_at: i64,
}

impl Playlist {
    pub fn new(name: impl Into<String>, items: Vec<String>, created_at: i64) -> Self {
        Self {
            id: PlaylistId::new(),
            name: name.into(),
            items,
            created_at,
        }
    }

    /// Identifier string used in routes and deep links.
    pub fn identifier(&self) -> String {
        self.id.to_string()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Validate playlist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }
        if self.items.iter().any(|item| item.is_empty()) {
            return Err("Playlist items cannot be empty identifiers".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_identifier_is_uuid() {
        let playlist = Playlist::new("Road trip", vec!["track:1".to_string()], 0);
        let id = playlist.identifier();
        assert_eq!(PlaylistId::from_string(&id).unwrap(), playlist.id);
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn test_playlist_validation() {
        assert!(Playlist::new("  ", vec![], 0).validate().is_err());
        assert!(Playlist::new("Mix", vec![String::new()], 0)
            .validate()
            .is_err());
        assert!(Playlist::new("Mix", vec![], 0).validate().is_ok());
    }
}
