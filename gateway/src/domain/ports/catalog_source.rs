//! Port for the live catalog feed.
//!
//! Opening the feed yields the full ordered snapshot plus a stream of entries
//! added afterwards. A stream item of `Err` or the end of the stream means the
//! feed dropped and must be reopened.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::CatalogEntry;

use super::define_port_error;

define_port_error! {
    /// Errors raised while opening or following the catalog feed.
    pub enum SyncError {
        /// The feed could not be opened.
        Unavailable { message: String } as ServiceUnavailable =>
            "catalog feed unavailable: {message}",
        /// An open feed dropped.
        Disconnected { message: String } as ServiceUnavailable =>
            "catalog feed disconnected: {message}",
    }
}

/// Open catalog subscription.
pub struct CatalogFeed {
    /// Every entry at open time, newest first.
    pub snapshot: Vec<CatalogEntry>,
    /// Entries added after the snapshot.
    pub changes: BoxStream<'static, Result<CatalogEntry, SyncError>>,
}

impl fmt::Debug for CatalogFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogFeed")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

/// Port for the externally curated catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Open the feed.
    async fn open(&self) -> Result<CatalogFeed, SyncError>;
}
