//! Live catalog feed for active members.
//!
//! Each [`CatalogSubscription`] owns a task that opens the catalog source,
//! forwards the ordered snapshot and then every added entry, and reopens the
//! source with backoff whenever the feed drops. Consumers keep showing the
//! entries they have until the next snapshot replaces them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use mockable::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::catalog::insert_ordered;
use crate::domain::ports::{CatalogSeeder, CatalogSource, SyncError};
use crate::domain::retry::{AttemptJitter, Backoff, BackoffJitter, Sleeper, TokioSleeper};
use crate::domain::session::SessionState;
use crate::domain::{CatalogEntry, Error};

/// Message delivered to a catalog subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUpdate {
    /// Full ordered set; replaces anything shown before.
    Snapshot(Vec<CatalogEntry>),
    /// Entry added after the last snapshot.
    Added(CatalogEntry),
    /// The feed dropped; a reconnect is scheduled.
    Reconnecting {
        /// Consecutive failed connections.
        attempt: u32,
        /// Why the feed dropped.
        error: SyncError,
    },
}

/// Catalog entries as last delivered to a subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMirror {
    entries: Vec<CatalogEntry>,
    stale: bool,
}

impl CatalogMirror {
    /// Fold `update` into the mirror.
    pub fn apply(&mut self, update: CatalogUpdate) {
        match update {
            CatalogUpdate::Snapshot(entries) => {
                self.entries = entries;
                self.stale = false;
            }
            CatalogUpdate::Added(entry) => {
                insert_ordered(&mut self.entries, entry);
            }
            CatalogUpdate::Reconnecting { .. } => self.stale = true,
        }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Whether the feed is currently reconnecting.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Runtime helpers used between reconnects.
pub struct SyncRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn Sleeper>,
    /// Jitter strategy for reconnect delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for SyncRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

struct FeedContext {
    source: Arc<dyn CatalogSource>,
    seeder: Arc<dyn CatalogSeeder>,
    seeded: Arc<AtomicBool>,
    clock: Arc<dyn Clock + Send + Sync>,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn BackoffJitter>,
}

/// Opens catalog subscriptions.
pub struct CatalogSyncChannel {
    source: Arc<dyn CatalogSource>,
    seeder: Arc<dyn CatalogSeeder>,
    seeded: Arc<AtomicBool>,
    clock: Arc<dyn Clock + Send + Sync>,
    backoff: Backoff,
    runtime: SyncRuntime,
}

impl CatalogSyncChannel {
    /// Create a channel with default runtime helpers.
    pub fn new(
        source: Arc<dyn CatalogSource>,
        seeder: Arc<dyn CatalogSeeder>,
        clock: Arc<dyn Clock + Send + Sync>,
        backoff: Backoff,
    ) -> Self {
        Self::with_runtime(source, seeder, clock, backoff, SyncRuntime::default())
    }

    /// Create a channel with explicit runtime helpers.
    pub fn with_runtime(
        source: Arc<dyn CatalogSource>,
        seeder: Arc<dyn CatalogSeeder>,
        clock: Arc<dyn Clock + Send + Sync>,
        backoff: Backoff,
        runtime: SyncRuntime,
    ) -> Self {
        Self {
            source,
            seeder,
            seeded: Arc::new(AtomicBool::new(false)),
            clock,
            backoff,
            runtime,
        }
    }

    /// Subscribe on behalf of `session`.
    ///
    /// Only active members may subscribe. Must be called from within a Tokio
    /// runtime.
    pub fn subscribe(&self, session: &SessionState) -> Result<CatalogSubscription, Error> {
        if !session.is_active() {
            return Err(Error::forbidden("the catalog is visible to active members only"));
        }

        let (tx, updates) = mpsc::unbounded_channel();
        let context = FeedContext {
            source: Arc::clone(&self.source),
            seeder: Arc::clone(&self.seeder),
            seeded: Arc::clone(&self.seeded),
            clock: Arc::clone(&self.clock),
            backoff: self.backoff,
            sleeper: Arc::clone(&self.runtime.sleeper),
            jitter: Arc::clone(&self.runtime.jitter),
        };
        let task = tokio::spawn(run_feed(context, tx));
        Ok(CatalogSubscription { updates, task })
    }
}

/// Live catalog subscription.
///
/// Dropping the subscription, or calling [`CatalogSubscription::unsubscribe`],
/// stops the feed task; no update is delivered afterwards.
#[derive(Debug)]
pub struct CatalogSubscription {
    updates: mpsc::UnboundedReceiver<CatalogUpdate>,
    task: JoinHandle<()>,
}

impl CatalogSubscription {
    /// Next update; `None` once the feed task has stopped.
    pub async fn next(&mut self) -> Option<CatalogUpdate> {
        self.updates.recv().await
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for CatalogSubscription {
    fn drop(&mut self) {
        self.task.abort();
        self.updates.close();
    }
}

async fn run_feed(context: FeedContext, tx: mpsc::UnboundedSender<CatalogUpdate>) {
    let mut attempt = 0_u32;
    loop {
        let error = match follow_feed(&context, &tx, &mut attempt).await {
            FeedEnd::Closed => return,
            FeedEnd::Dropped(error) => error,
        };

        attempt = attempt.saturating_add(1);
        warn!(attempt, error = %error, "catalog feed dropped; reconnecting");
        if tx
            .send(CatalogUpdate::Reconnecting {
                attempt,
                error,
            })
            .is_err()
        {
            return;
        }

        let base = context.backoff.base_delay(attempt);
        let delay = context
            .jitter
            .jittered_delay(base, attempt, context.clock.utc());
        context.sleeper.sleep(delay).await;
    }
}

enum FeedEnd {
    /// The subscriber went away.
    Closed,
    /// The source failed; reconnect.
    Dropped(SyncError),
}

async fn follow_feed(
    context: &FeedContext,
    tx: &mpsc::UnboundedSender<CatalogUpdate>,
    attempt: &mut u32,
) -> FeedEnd {
    let feed = match context.source.open().await {
        Ok(feed) => feed,
        Err(error) => return FeedEnd::Dropped(error),
    };
    *attempt = 0;

    let mut entries = Vec::with_capacity(feed.snapshot.len());
    for entry in feed.snapshot {
        insert_ordered(&mut entries, entry);
    }

    if entries.is_empty() && !context.seeded.swap(true, Ordering::SeqCst) {
        match context.seeder.seed().await {
            Ok(count) => info!(entries = count, "seeded empty catalog"),
            Err(err) => warn!(error = %err, "catalog seed failed"),
        }
    }

    if tx.send(CatalogUpdate::Snapshot(entries.clone())).is_err() {
        return FeedEnd::Closed;
    }
    debug!(entries = entries.len(), "catalog snapshot delivered");

    let mut changes = feed.changes;
    loop {
        match changes.next().await {
            Some(Ok(entry)) => {
                if insert_ordered(&mut entries, entry.clone())
                    && tx.send(CatalogUpdate::Added(entry)).is_err()
                {
                    return FeedEnd::Closed;
                }
            }
            Some(Err(error)) => return FeedEnd::Dropped(error),
            None => return FeedEnd::Dropped(SyncError::disconnected("feed ended")),
        }
    }
}
