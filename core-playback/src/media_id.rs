//! # Media Identifiers
//!
//! Structured identifier for anything the client can play or browse.
//!
//! ## Wire format
//!
//! ```text
//! <type token>:<percent-encoded value>
//!
//! track:3f1c          album:fake-id          search:daft%20punk
//! ```
//!
//! The encoded string is stored in playlists, notifications and deep links,
//! so the type tokens are stable. The value is percent-encoded, which keeps
//! the reserved characters `:` and `|` out of the encoded form; any UTF-8
//! value (including the empty string) round-trips.
//!
//! ```
//! use core_playback::media_id::{MediaId, MediaType};
//!
//! let id = MediaId::new(MediaType::SearchQuery, "a:b|c");
//! let encoded = id.encode();
//! assert_eq!(encoded, "search:a%3Ab%7Cc");
//! assert_eq!(MediaId::decode(&encoded).unwrap(), id);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Separator between the type token and the value.
pub const TYPE_DELIMITER: char = ':';

/// Kind of entity a [`MediaId`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaType {
    Track,
    Album,
    Artist,
    Playlist,
    /// Results of a free-text search; the value is the query.
    SearchQuery,
}

impl MediaType {
    pub const ALL: [MediaType; 5] = [
        MediaType::Track,
        MediaType::Album,
        MediaType::Artist,
        MediaType::Playlist,
        MediaType::SearchQuery,
    ];

    /// Stable wire token.
    pub fn token(&self) -> &'static str {
        match self {
            MediaType::Track => "track",
            MediaType::Album => "album",
            MediaType::Artist => "artist",
            MediaType::Playlist => "playlist",
            MediaType::SearchQuery => "search",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Track => "Track",
            MediaType::Album => "Album",
            MediaType::Artist => "Artist",
            MediaType::Playlist => "Playlist",
            MediaType::SearchQuery => "Search",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Failure to decode an encoded [`MediaId`].
///
/// Always recoverable: callers treat the input as opaque.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input does not follow `<type>:<value>`.
    #[error("Malformed media identifier: {reason}")]
    MalformedInput { reason: &'static str },

    /// Type token is not one of the recognised kinds.
    #[error("Unknown media type: {0:?}")]
    UnknownType(String),
}

impl DecodeError {
    fn malformed(reason: &'static str) -> Self {
        DecodeError::MalformedInput { reason }
    }
}

/// Identifier of a playable or browsable entity.
///
/// Equality and hashing are structural over `(kind, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId {
    kind: MediaType,
    value: String,
}

impl MediaId {
    pub fn new(kind: MediaType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn track(value: impl Into<String>) -> Self {
        Self::new(MediaType::Track, value)
    }

    pub fn album(value: impl Into<String>) -> Self {
        Self::new(MediaType::Album, value)
    }

    pub fn artist(value: impl Into<String>) -> Self {
        Self::new(MediaType::Artist, value)
    }

    pub fn playlist(value: impl Into<String>) -> Self {
        Self::new(MediaType::Playlist, value)
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::new(MediaType::SearchQuery, query)
    }

    pub fn kind(&self) -> MediaType {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Encode to the wire format. Never fails.
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.kind.token(),
            TYPE_DELIMITER,
            urlencoding::encode(&self.value)
        )
    }

    /// Decode the wire format.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::MalformedInput`] when the delimiter is missing, the
    ///   type segment is empty, or the value contains a raw reserved
    ///   character or invalid UTF-8 escapes
    /// - [`DecodeError::UnknownType`] for an unrecognised type token
    pub fn decode(input: &str) -> Result<Self, DecodeError> {
        let (token, raw_value) = input
            .split_once(TYPE_DELIMITER)
            .ok_or_else(|| DecodeError::malformed("missing type delimiter"))?;

        if token.is_empty() {
            return Err(DecodeError::malformed("empty type segment"));
        }

        let kind =
            MediaType::from_token(token).ok_or_else(|| DecodeError::UnknownType(token.to_string()))?;

        if raw_value.contains([TYPE_DELIMITER, crate::queue_title::EXTRA_SEPARATOR]) {
            return Err(DecodeError::malformed("reserved character in value"));
        }

        let value = urlencoding::decode(raw_value)
            .map_err(|_| DecodeError::malformed("value is not valid UTF-8"))?
            .into_owned();

        Ok(Self { kind, value })
    }

    /// Decode, logging and discarding failures.
    ///
    /// `None` means the input should be treated as an opaque, unplayable
    /// reference.
    pub fn decode_lossy(input: &str) -> Option<Self> {
        match Self::decode(input) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "Ignoring undecodable media identifier");
                None
            }
        }
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for MediaId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for MediaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_round_trips() {
        for kind in MediaType::ALL {
            let id = MediaId::new(kind, "fake-id");
            assert_eq!(MediaId::decode(&id.encode()).unwrap(), id);
            assert_eq!(MediaType::from_token(kind.token()), Some(kind));
        }
    }

    #[test]
    fn test_reserved_and_unicode_values_round_trip() {
        let values = ["", "a:b", "x|y", "100%", "space d", "Beyoncé – Halo", "::||%%"];
        for value in values {
            let id = MediaId::search(value);
            let encoded = id.encode();
            assert!(!encoded[7..].contains(':'), "raw delimiter in {}", encoded);
            assert!(!encoded.contains('|'), "raw separator in {}", encoded);
            assert_eq!(MediaId::decode(&encoded).unwrap(), id);
        }
    }

    #[test]
    fn test_stable_wire_format() {
        assert_eq!(MediaId::album("fake-id").encode(), "album:fake-id");
        assert_eq!(MediaId::track("t 1").to_string(), "track:t%201");
        assert_eq!(MediaId::search("").encode(), "search:");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            MediaId::decode("no-delimiter"),
            Err(DecodeError::MalformedInput { .. })
        ));
        assert!(matches!(
            MediaId::decode(":value"),
            Err(DecodeError::MalformedInput { .. })
        ));
        assert!(matches!(
            MediaId::decode("album:a|b"),
            Err(DecodeError::MalformedInput { .. })
        ));
        assert!(matches!(
            MediaId::decode("album:%FF"),
            Err(DecodeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            MediaId::decode("podcast:123"),
            Err(DecodeError::UnknownType("podcast".to_string()))
        );
        assert_eq!(
            MediaId::decode("Album:123"),
            Err(DecodeError::UnknownType("Album".to_string()))
        );
    }

    #[test]
    fn test_decode_lossy_falls_back() {
        assert_eq!(MediaId::decode_lossy("garbage"), None);
        assert_eq!(
            MediaId::decode_lossy("artist:a1"),
            Some(MediaId::artist("a1"))
        );
    }

    #[test]
    fn test_structural_equality_and_hashing() {
        let mut set = HashSet::new();
        set.insert(MediaId::album("1"));
        set.insert(MediaId::album("1"));
        set.insert(MediaId::artist("1"));
        assert_eq!(set.len(), 2);
        assert_ne!(MediaId::album("1"), MediaId::album("2"));
    }

    #[test]
    fn test_from_str_and_serde_use_encoded_form() {
        let id: MediaId = "playlist:p%2F1".parse().unwrap();
        assert_eq!(id.value(), "p/1");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"playlist:p%2F1\"");
        assert_eq!(serde_json::from_str::<MediaId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<MediaId>("\"bogus\"").is_err());
    }
}
