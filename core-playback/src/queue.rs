//! # Playback Queue State
//!
//! Immutable snapshot of the engine's queue. The session connection is the
//! only producer; everybody else receives clones through the queue stream.
//!
//! Invariant: a non-empty queue has `current_index < items.len()`, an empty
//! queue has `current_index == 0`.

use crate::error::{PlaybackError, Result};
use crate::media_id::MediaId;
use crate::queue_title::QueueTitle;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackQueueState {
    items: Vec<MediaId>,
    current_index: usize,
    title: Option<QueueTitle>,
}

impl PlaybackQueueState {
    /// Build a queue, rejecting an index that breaks the invariant.
    pub fn new(
        items: Vec<MediaId>,
        current_index: usize,
        title: Option<QueueTitle>,
    ) -> Result<Self> {
        let valid = if items.is_empty() {
            current_index == 0
        } else {
            current_index < items.len()
        };
        if !valid {
            return Err(PlaybackError::InvalidQueueIndex {
                index: current_index,
                len: items.len(),
            });
        }

        Ok(Self {
            items,
            current_index,
            title,
        })
    }

    /// No items, untitled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a queue, clamping `current_index` to the last item.
    pub(crate) fn clamped(
        items: Vec<MediaId>,
        current_index: usize,
        title: Option<QueueTitle>,
    ) -> Self {
        let current_index = current_index.min(items.len().saturating_sub(1));
        Self {
            items,
            current_index,
            title,
        }
    }

    /// Same queue instance with a different current item (clamped).
    pub(crate) fn with_current_index(&self, index: usize) -> Self {
        Self::clamped(self.items.clone(), index, self.title.clone())
    }

    pub fn items(&self) -> &[MediaId] {
        &self.items
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// `None` for an untitled queue.
    pub fn title(&self) -> Option<&QueueTitle> {
        self.title.as_ref()
    }

    pub fn current(&self) -> Option<&MediaId> {
        self.items.get(self.current_index)
    }

    /// Where the queue came from.
    pub fn source_media_id(&self) -> Option<&MediaId> {
        self.title.as_ref().map(QueueTitle::source)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.items.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<MediaId> {
        (0..n).map(|i| MediaId::track(format!("t{}", i))).collect()
    }

    #[test]
    fn test_new_validates_index() {
        assert!(PlaybackQueueState::new(tracks(3), 2, None).is_ok());
        assert!(matches!(
            PlaybackQueueState::new(tracks(3), 3, None),
            Err(PlaybackError::InvalidQueueIndex { index: 3, len: 3 })
        ));
        assert!(PlaybackQueueState::new(vec![], 0, None).is_ok());
        assert!(PlaybackQueueState::new(vec![], 1, None).is_err());
    }

    #[test]
    fn test_current_and_source() {
        let title = QueueTitle::new(MediaId::album("fake-id"));
        let queue = PlaybackQueueState::new(tracks(3), 1, Some(title)).unwrap();

        assert_eq!(queue.current(), Some(&MediaId::track("t1")));
        assert_eq!(queue.source_media_id(), Some(&MediaId::album("fake-id")));
        assert!(queue.has_next());
        assert!(queue.has_previous());
    }

    #[test]
    fn test_empty_queue() {
        let queue = PlaybackQueueState::empty();
        assert!(queue.is_empty());
        assert_eq!(queue.current(), None);
        assert_eq!(queue.source_media_id(), None);
        assert!(!queue.has_next());
        assert!(!queue.has_previous());
    }

    #[test]
    fn test_clamping_keeps_invariant() {
        for len in 0..4 {
            for index in 0..6 {
                let queue = PlaybackQueueState::clamped(tracks(len), index, None);
                if queue.is_empty() {
                    assert_eq!(queue.current_index(), 0);
                } else {
                    assert!(queue.current_index() < queue.len());
                }
            }
        }
    }

    #[test]
    fn test_with_current_index_keeps_identity() {
        let title = QueueTitle::new(MediaId::playlist("p"));
        let queue = PlaybackQueueState::new(tracks(2), 0, Some(title.clone())).unwrap();

        let moved = queue.with_current_index(9);
        assert_eq!(moved.current_index(), 1);
        assert_eq!(moved.items(), queue.items());
        assert_eq!(moved.title(), Some(&title));
    }
}
