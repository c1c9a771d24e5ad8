//! # Observable Values
//!
//! Single-writer, many-reader value cell with "replay latest" semantics.
//!
//! A new [`Subscription`] first yields the value current at subscription
//! time, then every later publication in order. Publications are never
//! coalesced or dropped (unlike `tokio::sync::watch` or a lagging
//! `broadcast` receiver): each subscriber owns an unbounded queue, so a slow
//! observer only costs memory until it catches up.
//!
//! ```
//! use core_playback::observable::ObservableCell;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cell = ObservableCell::new(0u32);
//! let mut sub = cell.subscribe();
//! cell.publish(1);
//! cell.publish(2);
//!
//! assert_eq!(sub.next().await, Some(0));
//! assert_eq!(sub.next().await, Some(1));
//! assert_eq!(sub.next().await, Some(2));
//! # }
//! ```

use futures::stream::{self, Stream};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

struct Shared<T> {
    value: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> Shared<T> {
    /// Deliver to every live subscriber and forget the dropped ones.
    fn notify(&mut self, value: &T) {
        self.subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
    }
}

/// Hot value cell. Clones share the same value and subscribers.
pub struct ObservableCell<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> ObservableCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.shared.lock().value.clone()
    }

    /// Replace the value and notify subscribers.
    pub fn publish(&self, value: T) {
        let mut shared = self.shared.lock();
        shared.notify(&value);
        shared.value = value;
    }

    /// Publish a modified copy of the current value.
    pub fn update(&self, modify: impl FnOnce(&mut T)) -> T {
        let mut shared = self.shared.lock();
        modify(&mut shared.value);
        let value = shared.value.clone();
        shared.notify(&value);
        value
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock();
        shared.subscribers.push(sender);
        Subscription {
            pending: Some(shared.value.clone()),
            receiver,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut shared = self.shared.lock();
        shared.subscribers.retain(|subscriber| !subscriber.is_closed());
        shared.subscribers.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("ObservableCell")
            .field("value", &shared.value)
            .field("subscribers", &shared.subscribers.len())
            .finish()
    }
}

/// Ordered view of an [`ObservableCell`]. Ends once every clone of the
/// cell is dropped and the queued values are drained.
pub struct Subscription<T> {
    pending: Option<T>,
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Next value, or `None` once the cell is gone.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = T> + Send {
        stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|value| (value, subscription))
        })
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("has_pending", &self.pending.is_some())
            .finish()
    }
}
