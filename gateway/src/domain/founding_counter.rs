//! Founding-member number allocation.
//!
//! [`FoundingCounterAllocator`] is the only writer of the shared counter. Each
//! allocation is one store transaction that creates the counter at the
//! configured baseline when missing and increments it by one. Conflicting
//! commits are retried by the store; transient failures that still escape are
//! retried here with exponential backoff before giving up.

use std::fmt;
use std::sync::Arc;

use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::ports::{CounterStoreError, CounterUpdate, FoundingCounterStore};
use crate::domain::retry::{AttemptJitter, Backoff, BackoffJitter, Sleeper, TokioSleeper};
use crate::domain::FoundingMemberNumber;

/// Allocation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Counter value before the first allocation; the first number is one
    /// higher.
    pub baseline: u64,
    /// Advertised size of the founding cohort.
    pub capacity: u64,
    /// Transactions attempted before failing.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Backoff,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            baseline: 142,
            capacity: 200,
            max_attempts: 5,
            backoff: Backoff {
                initial: std::time::Duration::from_millis(25),
                max: std::time::Duration::from_secs(1),
            },
        }
    }
}

/// Runtime helpers used between attempts.
pub struct AllocatorRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn Sleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for AllocatorRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Allocation gave up; no number was assigned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("founding number allocation failed after {attempts} attempt(s): {source}")]
pub struct TransientAllocationError {
    /// Attempts made.
    pub attempts: u32,
    /// Last store failure.
    #[source]
    pub source: CounterStoreError,
}

/// Public "#N / capacity claimed" tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundingTally {
    /// Highest allocated number, or the baseline before any allocation.
    pub claimed: u64,
    /// Advertised cohort size.
    pub capacity: u64,
}

impl fmt::Display for FoundingTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} / {} claimed", self.claimed, self.capacity)
    }
}

/// Allocates founding member numbers from the shared counter.
pub struct FoundingCounterAllocator {
    store: Arc<dyn FoundingCounterStore>,
    clock: Arc<dyn Clock + Send + Sync>,
    config: AllocatorConfig,
    runtime: AllocatorRuntime,
}

impl FoundingCounterAllocator {
    /// Create an allocator with default runtime helpers.
    pub fn new(
        store: Arc<dyn FoundingCounterStore>,
        clock: Arc<dyn Clock + Send + Sync>,
        config: AllocatorConfig,
    ) -> Self {
        Self::with_runtime(store, clock, config, AllocatorRuntime::default())
    }

    /// Create an allocator with explicit runtime helpers.
    pub fn with_runtime(
        store: Arc<dyn FoundingCounterStore>,
        clock: Arc<dyn Clock + Send + Sync>,
        config: AllocatorConfig,
        runtime: AllocatorRuntime,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            runtime,
        }
    }

    /// Allocation tuning in effect.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocate the next number.
    ///
    /// Returns a value strictly greater than every number returned before.
    /// Callers must not activate a profile when this fails.
    pub async fn allocate(&self) -> Result<FoundingMemberNumber, TransientAllocationError> {
        let baseline = self.config.baseline;
        let update: CounterUpdate =
            Arc::new(move |current| current.unwrap_or(baseline).saturating_add(1));
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            let err = match self.store.transact(Arc::clone(&update)).await {
                Ok(value) => match FoundingMemberNumber::new(value) {
                    Some(number) => {
                        info!(founding_member_number = value, attempt, "allocated founding number");
                        return Ok(number);
                    }
                    None => CounterStoreError::query("counter committed a zero value"),
                },
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                warn!(attempts = attempt, error = %err, "founding number allocation exhausted");
                return Err(TransientAllocationError {
                    attempts: attempt,
                    source: err,
                });
            }

            let base = self.config.backoff.base_delay(attempt);
            let delay = self
                .runtime
                .jitter
                .jittered_delay(base, attempt, self.clock.utc());
            debug!(attempt, delay_ms = delay.as_millis(), error = %err, "retrying founding number allocation");
            self.runtime.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Current tally, showing the baseline before the first allocation.
    pub async fn tally(&self) -> Result<FoundingTally, CounterStoreError> {
        let current = self.store.current().await?;
        Ok(self.tally_for(current))
    }

    /// Tally for a raw counter value.
    pub fn tally_for(&self, value: Option<u64>) -> FoundingTally {
        FoundingTally {
            claimed: value.unwrap_or(self.config.baseline),
            capacity: self.config.capacity,
        }
    }

    /// Subscribe to committed counter values.
    pub fn watch(&self) -> watch::Receiver<Option<u64>> {
        self.store.watch()
    }
}

#[cfg(test)]
mod tests;
