//! Port for the shared founding counter document.
//!
//! The store exposes one capability, [`FoundingCounterStore::transact`]: run
//! a pure update over the current value inside an all-or-nothing transaction.
//! Adapters retry conflicting commits internally; callers see a single
//! suspending call that either commits or fails.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::define_port_error;

define_port_error! {
    /// Errors raised by founding counter store adapters.
    pub enum CounterStoreError {
        /// Conflicting writers aborted every attempt.
        Contention { attempts: u32 } as Conflict =>
            "counter transaction aborted after {attempts} conflicting attempts",
        /// Store connection could not be established.
        Connection { message: String } as ServiceUnavailable =>
            "counter store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } as InternalError =>
            "counter store query failed: {message}",
    }
}

/// Pure read-modify-write step run inside a counter transaction.
///
/// Receives the committed value (`None` when the counter document does not
/// exist yet) and returns the value to commit. It may run more than once.
pub type CounterUpdate = Arc<dyn Fn(Option<u64>) -> u64 + Send + Sync>;

/// Port for the singleton founding counter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FoundingCounterStore: Send + Sync {
    /// Apply `update` atomically and return the committed value.
    async fn transact(&self, update: CounterUpdate) -> Result<u64, CounterStoreError>;

    /// Read the committed value; `None` before the first allocation.
    async fn current(&self) -> Result<Option<u64>, CounterStoreError>;

    /// Subscribe to committed counter values.
    fn watch(&self) -> watch::Receiver<Option<u64>>;
}
