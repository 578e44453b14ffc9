//! PostgreSQL-backed `FoundingCounterStore` implementation using Diesel ORM.
//!
//! Each transaction reads the counter row, runs the update and upserts the
//! result inside a SERIALIZABLE transaction. PostgreSQL aborts one of two
//! conflicting transactions with a serialization failure; those are retried
//! here up to a bounded number of attempts.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::ports::{CounterStoreError, CounterUpdate, FoundingCounterStore};

use super::diesel_error_mapping::{is_serialization_failure, map_diesel_error};
use super::models::NewFoundingCounterRow;
use super::pool::DbPool;
use super::schema::founding_counters;

/// Row name of the founding counter.
pub const FOUNDING_COUNTER_NAME: &str = "founding_members";

/// Default transaction attempts before reporting contention.
pub const DEFAULT_SERIALIZABLE_ATTEMPTS: u32 = 16;

/// Failure inside the counter transaction.
#[derive(Debug)]
enum CounterTxError {
    Diesel(DieselError),
    OutOfRange(u64),
    Corrupt(i64),
}

impl From<DieselError> for CounterTxError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl From<CounterTxError> for CounterStoreError {
    fn from(value: CounterTxError) -> Self {
        match value {
            CounterTxError::Diesel(error) => map_diesel_error(&error, Self::query, Self::connection),
            CounterTxError::OutOfRange(value) => {
                Self::query(format!("counter value {value} does not fit the column"))
            }
            CounterTxError::Corrupt(value) => {
                Self::query(format!("stored counter value {value} is negative"))
            }
        }
    }
}

/// Diesel-backed implementation of the `FoundingCounterStore` port.
pub struct DieselFoundingCounterStore {
    pool: DbPool,
    committed: watch::Sender<Option<u64>>,
    max_attempts: u32,
}

impl DieselFoundingCounterStore {
    /// Create a store over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            committed: watch::Sender::new(None),
            max_attempts: DEFAULT_SERIALIZABLE_ATTEMPTS,
        }
    }

    /// Override the attempt bound.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Publish `value` unless a newer value was already published.
    fn publish(&self, value: u64) {
        self.committed.send_if_modified(|current| {
            if current.is_some_and(|seen| seen >= value) {
                return false;
            }
            *current = Some(value);
            true
        });
    }
}

fn stored_value(raw: i64) -> Result<u64, CounterTxError> {
    u64::try_from(raw).map_err(|_| CounterTxError::Corrupt(raw))
}

#[async_trait]
impl FoundingCounterStore for DieselFoundingCounterStore {
    async fn transact(&self, update: CounterUpdate) -> Result<u64, CounterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CounterStoreError::connection(err.message()))?;

        for attempt in 1..=self.max_attempts {
            let step = update.clone();
            let result = conn
                .build_transaction()
                .serializable()
                .run(|conn| {
                    async move {
                        let current = founding_counters::table
                            .filter(founding_counters::name.eq(FOUNDING_COUNTER_NAME))
                            .select(founding_counters::value)
                            .first::<i64>(conn)
                            .await
                            .optional()?
                            .map(stored_value)
                            .transpose()?;

                        let next = step(current);
                        let stored = i64::try_from(next).map_err(|_| CounterTxError::OutOfRange(next))?;

                        diesel::insert_into(founding_counters::table)
                            .values(&NewFoundingCounterRow {
                                name: FOUNDING_COUNTER_NAME,
                                value: stored,
                            })
                            .on_conflict(founding_counters::name)
                            .do_update()
                            .set((
                                founding_counters::value.eq(stored),
                                founding_counters::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await?;

                        Ok::<_, CounterTxError>(next)
                    }
                    .scope_boxed()
                })
                .await;

            match result {
                Ok(next) => {
                    self.publish(next);
                    return Ok(next);
                }
                Err(CounterTxError::Diesel(ref error)) if is_serialization_failure(error) => {
                    debug!(attempt, "counter transaction serialization failure");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(CounterStoreError::contention(self.max_attempts))
    }

    async fn current(&self) -> Result<Option<u64>, CounterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CounterStoreError::connection(err.message()))?;

        let raw = founding_counters::table
            .filter(founding_counters::name.eq(FOUNDING_COUNTER_NAME))
            .select(founding_counters::value)
            .first::<i64>(&mut conn)
            .await
            .optional()
            .map_err(|err| {
                map_diesel_error(&err, CounterStoreError::query, CounterStoreError::connection)
            })?;

        let value = raw
            .map(stored_value)
            .transpose()
            .map_err(CounterStoreError::from)?;
        if let Some(value) = value {
            self.publish(value);
        }
        Ok(value)
    }

    fn watch(&self) -> watch::Receiver<Option<u64>> {
        self.committed.subscribe()
    }
}
