//! Process-local change notification for stored documents.
//!
//! Stores publish each committed snapshot after the write succeeds; sessions
//! subscribe per key and are woken by `tokio::sync::watch` rather than
//! polling.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Latest committed snapshot per key.
#[derive(Debug)]
pub struct ChangeFeed<K, V> {
    channels: Mutex<HashMap<K, watch::Sender<Option<V>>>>,
}

impl<K, V> Default for ChangeFeed<K, V> {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> ChangeFeed<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    fn lock(&self) -> MutexGuard<'_, HashMap<K, watch::Sender<Option<V>>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receiver for `key`, starting at the last snapshot published while it
    /// was being watched.
    pub fn subscribe(&self, key: &K) -> watch::Receiver<Option<V>> {
        let mut channels = self.lock();
        prune_unwatched(&mut channels);
        channels
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(None))
            .subscribe()
    }

    /// Publish a committed snapshot; unchanged values wake nobody.
    ///
    /// Keys nobody watches are dropped rather than retained.
    pub fn publish(&self, key: &K, value: V) {
        let mut channels = self.lock();
        if let Some(sender) = channels.get(key) {
            sender.send_if_modified(|current| {
                if current.as_ref() == Some(&value) {
                    return false;
                }
                *current = Some(value);
                true
            });
        }
        prune_unwatched(&mut channels);
    }

    /// Keys currently held.
    pub fn watched_keys(&self) -> usize {
        self.lock().len()
    }
}

fn prune_unwatched<K, V>(channels: &mut HashMap<K, watch::Sender<Option<V>>>) {
    channels.retain(|_, sender| sender.receiver_count() > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn subscribers_see_later_publications() {
        let feed = ChangeFeed::<&'static str, u64>::default();
        let mut rx = feed.subscribe(&"counter");
        assert_eq!(*rx.borrow(), None);

        feed.publish(&"counter", 143);
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow_and_update(), Some(143));
    }

    #[rstest]
    fn late_subscribers_start_at_latest_value() {
        let feed = ChangeFeed::<&'static str, u64>::default();
        let _session = feed.subscribe(&"counter");
        feed.publish(&"counter", 143);
        feed.publish(&"counter", 144);

        let rx = feed.subscribe(&"counter");
        assert_eq!(*rx.borrow(), Some(144));
    }

    #[rstest]
    fn republishing_the_same_value_is_silent() {
        let feed = ChangeFeed::<&'static str, u64>::default();
        let mut rx = feed.subscribe(&"counter");
        feed.publish(&"counter", 143);
        assert_eq!(*rx.borrow_and_update(), Some(143));

        feed.publish(&"counter", 143);
        assert!(!rx.has_changed().expect("sender alive"));
    }

    #[rstest]
    fn keys_without_receivers_are_released() {
        let feed = ChangeFeed::<u32, u64>::default();
        for user in 0..100 {
            drop(feed.subscribe(&user));
            feed.publish(&user, 143);
        }
        assert_eq!(feed.watched_keys(), 0);

        let kept = feed.subscribe(&7);
        feed.publish(&8, 144);
        assert_eq!(feed.watched_keys(), 1);
        assert_eq!(*kept.borrow(), None);
    }

    #[rstest]
    fn unwatched_publications_are_not_retained() {
        let feed = ChangeFeed::<&'static str, u64>::default();
        feed.publish(&"counter", 143);

        assert_eq!(feed.watched_keys(), 0);
        assert_eq!(*feed.subscribe(&"counter").borrow(), None);
    }
}
