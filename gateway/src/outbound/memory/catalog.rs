//! In-process catalog feed and its starter-drop seeder.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use mockable::Clock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::domain::catalog::insert_ordered;
use crate::domain::ports::{CatalogFeed, CatalogSeedError, CatalogSeeder, CatalogSource, SyncError};
use crate::domain::{CatalogEntry, starter_drops};

const FEED_CAPACITY: usize = 256;

#[derive(Debug)]
struct CatalogState {
    entries: Vec<CatalogEntry>,
    added: broadcast::Sender<CatalogEntry>,
    available: bool,
}

/// Curated catalog held in memory.
///
/// Open feeds receive every entry published after they opened. Feeds can be
/// dropped and the source taken offline to exercise reconnects.
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl MemoryCatalog {
    /// Empty, available catalog.
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let (added, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Mutex::new(CatalogState {
                entries: Vec::new(),
                added,
                available: true,
            }),
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `entry` and broadcast it to open feeds.
    ///
    /// Returns `false` when an entry with the same id already exists.
    pub fn publish(&self, entry: CatalogEntry) -> bool {
        let mut state = self.state();
        if !insert_ordered(&mut state.entries, entry.clone()) {
            return false;
        }
        if state.added.send(entry).is_err() {
            debug!("catalog entry published with no open feeds");
        }
        true
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.state().entries.clone()
    }

    /// End every open feed.
    pub fn drop_feeds(&self) {
        let (added, _) = broadcast::channel(FEED_CAPACITY);
        self.state().added = added;
    }

    /// Make later `open` calls fail (`false`) or succeed (`true`).
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn open(&self) -> Result<CatalogFeed, SyncError> {
        let (snapshot, receiver) = {
            let state = self.state();
            if !state.available {
                return Err(SyncError::unavailable("catalog source offline"));
            }
            (state.entries.clone(), state.added.subscribe())
        };

        let changes = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(entry) => Some((Ok(entry), receiver)),
                Err(RecvError::Lagged(skipped)) => Some((
                    Err(SyncError::disconnected(format!(
                        "feed fell behind by {skipped} entries"
                    ))),
                    receiver,
                )),
                Err(RecvError::Closed) => None,
            }
        })
        .boxed();

        Ok(CatalogFeed { snapshot, changes })
    }
}

#[async_trait]
impl CatalogSeeder for MemoryCatalog {
    async fn seed(&self) -> Result<usize, CatalogSeedError> {
        let mut written = 0;
        for entry in starter_drops(self.clock.utc()) {
            if self.publish(entry) {
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    use crate::domain::CatalogEntryId;
    use crate::test_support::{fixture_clock, fixture_instant};

    #[fixture]
    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(fixture_clock())
    }

    fn entry(id: &str, minutes: i64) -> CatalogEntry {
        CatalogEntry {
            id: CatalogEntryId::new(id),
            title: format!("Drop {id}"),
            location: "Lisbon, PT".to_owned(),
            category: "Hotel Stay".to_owned(),
            description: "Riverside suite.".to_owned(),
            is_new: false,
            expires_at: None,
            external_link: "#".to_owned(),
            created_at: fixture_instant() + chrono::Duration::minutes(minutes),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn open_returns_snapshot_then_later_entries(catalog: MemoryCatalog) {
        catalog.publish(entry("a", 1));
        let mut feed = catalog.open().await.expect("feed opens");
        assert_eq!(feed.snapshot, vec![entry("a", 1)]);

        assert!(catalog.publish(entry("b", 2)));
        let next = feed.changes.next().await.expect("item").expect("entry");
        assert_eq!(next, entry("b", 2));
    }

    #[rstest]
    fn duplicate_ids_are_not_republished(catalog: MemoryCatalog) {
        assert!(catalog.publish(entry("a", 1)));
        assert!(!catalog.publish(entry("a", 5)));
        assert_eq!(catalog.entries().len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn seed_writes_the_starter_drops_once(catalog: MemoryCatalog) {
        assert_eq!(catalog.seed().await.expect("seed"), 3);
        assert_eq!(catalog.seed().await.expect("seed"), 0);

        let titles: Vec<String> = catalog.entries().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Tulum Beachfront", "Kyoto Machiya", "Napa Estate"]);
    }

    #[rstest]
    #[tokio::test]
    async fn dropped_feeds_end_and_offline_source_refuses(catalog: MemoryCatalog) {
        let mut feed = catalog.open().await.expect("feed opens");
        catalog.drop_feeds();
        assert!(feed.changes.next().await.is_none());

        catalog.set_available(false);
        let err = catalog.open().await.expect_err("offline");
        assert!(matches!(err, SyncError::Unavailable { .. }));

        catalog.set_available(true);
        assert!(catalog.open().await.is_ok());
    }
}
