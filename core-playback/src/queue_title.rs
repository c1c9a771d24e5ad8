//! # Queue Titles
//!
//! Provenance of a playback queue ("these tracks came from album X", "from
//! a search for Y"). The title travels as plain text through notifications
//! and deep links and is parsed back to drive navigation, so it is a data
//! descriptor rather than a display string.
//!
//! ```text
//! <encoded source>[|<percent-encoded extra>]
//!
//! album:fake-id
//! search:lofi|Late%20night
//! ```
//!
//! `|` never appears inside an encoded [`MediaId`], so the first `|` always
//! ends the source segment.

use crate::media_id::{DecodeError, MediaId, MediaType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Separator between the source identifier and the extra segment.
pub const EXTRA_SEPARATOR: char = '|';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Queue title has no source identifier")]
    MissingSource,

    #[error("Queue title source is invalid: {0}")]
    Decode(#[from] DecodeError),

    #[error("Queue title extra segment is malformed")]
    MalformedExtra,
}

/// Where a queue came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueTitle {
    source: MediaId,
    extra: Option<String>,
}

impl QueueTitle {
    pub fn new(source: MediaId) -> Self {
        Self {
            source,
            extra: None,
        }
    }

    pub fn with_extra(source: MediaId, extra: impl Into<String>) -> Self {
        Self {
            source,
            extra: Some(extra.into()),
        }
    }

    pub fn source(&self) -> &MediaId {
        &self.source
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// Parse the string form produced by `to_string()`.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let (source, extra) = match input.split_once(EXTRA_SEPARATOR) {
            Some((source, extra)) => (source, Some(extra)),
            None => (input, None),
        };

        if source.is_empty() {
            return Err(ParseError::MissingSource);
        }
        let source = MediaId::decode(source)?;

        let extra = match extra {
            Some(raw) if raw.contains(EXTRA_SEPARATOR) => return Err(ParseError::MalformedExtra),
            Some(raw) => Some(
                urlencoding::decode(raw)
                    .map_err(|_| ParseError::MalformedExtra)?
                    .into_owned(),
            ),
            None => None,
        };

        Ok(Self { source, extra })
    }

    /// Parse, falling back to an untitled queue (`None`) on failure.
    pub fn parse_or_untitled(input: &str) -> Option<Self> {
        match Self::parse(input) {
            Ok(title) => Some(title),
            Err(error) => {
                warn!(%error, "Unparseable queue title; treating queue as untitled");
                None
            }
        }
    }

    /// Name for a playlist saved from this queue: the extra segment when it
    /// is non-blank, the query for searches, otherwise the source kind.
    pub fn display_name(&self) -> String {
        if let Some(extra) = self.extra.as_deref().map(str::trim) {
            if !extra.is_empty() {
                return extra.to_string();
            }
        }

        match self.source.kind() {
            MediaType::SearchQuery if !self.source.value().trim().is_empty() => {
                self.source.value().trim().to_string()
            }
            kind => kind.label().to_string(),
        }
    }
}

impl fmt::Display for QueueTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source.encode())?;
        if let Some(extra) = &self.extra {
            write!(f, "{}{}", EXTRA_SEPARATOR, urlencoding::encode(extra))?;
        }
        Ok(())
    }
}

impl FromStr for QueueTitle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for QueueTitle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QueueTitle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_title_round_trips() {
        let title = QueueTitle::new(MediaId::album("fake-id"));
        let text = title.to_string();
        assert_eq!(text, "album:fake-id");
        assert_eq!(QueueTitle::parse(&text).unwrap(), title);
    }

    #[test]
    fn test_extra_segment_round_trips() {
        let cases = [
            QueueTitle::with_extra(MediaId::search("lofi"), "Late night"),
            QueueTitle::with_extra(MediaId::album("a|b"), "x|y:z%"),
            QueueTitle::with_extra(MediaId::artist("a1"), ""),
        ];
        for title in cases {
            let text = title.to_string();
            assert_eq!(text.matches(EXTRA_SEPARATOR).count(), 1, "{}", text);
            assert_eq!(QueueTitle::parse(&text).unwrap(), title);
        }
    }

    #[test]
    fn test_missing_source() {
        assert_eq!(QueueTitle::parse(""), Err(ParseError::MissingSource));
        assert_eq!(QueueTitle::parse("|extra"), Err(ParseError::MissingSource));
    }

    #[test]
    fn test_decode_errors_propagate() {
        assert_eq!(
            QueueTitle::parse("radio:1|x"),
            Err(ParseError::Decode(DecodeError::UnknownType("radio".to_string())))
        );
        assert!(matches!(
            QueueTitle::parse("nodelimiter"),
            Err(ParseError::Decode(DecodeError::MalformedInput { .. }))
        ));
    }

    #[test]
    fn test_malformed_extra() {
        assert_eq!(
            QueueTitle::parse("album:1|a|b"),
            Err(ParseError::MalformedExtra)
        );
        assert_eq!(
            QueueTitle::parse("album:1|%C3%28"),
            Err(ParseError::MalformedExtra)
        );
    }

    #[test]
    fn test_parse_or_untitled() {
        assert!(QueueTitle::parse_or_untitled("???").is_none());
        assert_eq!(
            QueueTitle::parse_or_untitled("playlist:p1"),
            Some(QueueTitle::new(MediaId::playlist("p1")))
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            QueueTitle::with_extra(MediaId::album("1"), " Discovery ").display_name(),
            "Discovery"
        );
        assert_eq!(QueueTitle::new(MediaId::search("daft punk")).display_name(), "daft punk");
        assert_eq!(QueueTitle::new(MediaId::search("  ")).display_name(), "Search");
        assert_eq!(
            QueueTitle::with_extra(MediaId::artist("1"), "   ").display_name(),
            "Artist"
        );
    }

    #[test]
    fn test_serde_uses_string_form() {
        let title = QueueTitle::with_extra(MediaId::album("x"), "y");
        let json = serde_json::to_string(&title).unwrap();
        assert_eq!(json, "\"album:x|y\"");
        assert_eq!(serde_json::from_str::<QueueTitle>(&json).unwrap(), title);
    }
}
