//! Allocation, retry and tally behaviour.

use std::sync::Mutex;
use std::time::Duration;

use rstest::rstest;

use super::*;
use crate::domain::ports::MockFoundingCounterStore;
use crate::domain::retry::NoJitter;
use crate::domain::retry::test_support::RecordingSleeper;
use crate::test_support::fixture_clock;

fn allocator(store: MockFoundingCounterStore, sleeper: RecordingSleeper) -> FoundingCounterAllocator {
    FoundingCounterAllocator::with_runtime(
        Arc::new(store),
        fixture_clock(),
        AllocatorConfig::default(),
        AllocatorRuntime {
            sleeper: Arc::new(sleeper),
            jitter: Arc::new(NoJitter),
        },
    )
}

/// Store double that applies updates to an in-memory value, failing the
/// first `failures` calls with `error`.
fn scripted_store(
    initial: Option<u64>,
    failures: usize,
    error: CounterStoreError,
) -> MockFoundingCounterStore {
    let value = Arc::new(Mutex::new(initial));
    let remaining = Arc::new(Mutex::new(failures));
    let mut store = MockFoundingCounterStore::new();
    store.expect_transact().returning(move |update| {
        let mut remaining = remaining.lock().expect("failures mutex");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(error.clone());
        }
        let mut value = value.lock().expect("value mutex");
        let next = update(*value);
        *value = Some(next);
        Ok(next)
    });
    store
}

#[tokio::test]
async fn first_allocation_creates_counter_above_baseline() {
    let allocator = allocator(
        scripted_store(None, 0, CounterStoreError::query("unused")),
        RecordingSleeper::default(),
    );

    let first = allocator.allocate().await.expect("allocation succeeds");
    let second = allocator.allocate().await.expect("allocation succeeds");

    assert_eq!(first.get(), 143);
    assert_eq!(second.get(), 144);
}

#[tokio::test]
async fn transient_failures_are_retried_with_backoff() {
    let sleeper = RecordingSleeper::default();
    let allocator = allocator(
        scripted_store(Some(150), 2, CounterStoreError::contention(3_u32)),
        sleeper.clone(),
    );

    let number = allocator.allocate().await.expect("third attempt succeeds");

    assert_eq!(number.get(), 151);
    assert_eq!(
        sleeper.calls(),
        vec![Duration::from_millis(25), Duration::from_millis(50)]
    );
}

#[tokio::test]
async fn exhausting_attempts_fails_transiently() {
    let sleeper = RecordingSleeper::default();
    let allocator = allocator(
        scripted_store(None, usize::MAX, CounterStoreError::connection("refused")),
        sleeper.clone(),
    );

    let err = allocator.allocate().await.expect_err("allocation must fail");

    assert_eq!(err.attempts, 5);
    assert_eq!(err.source, CounterStoreError::connection("refused"));
    assert_eq!(sleeper.calls().len(), 4);
}

#[tokio::test]
async fn permanent_store_errors_fail_without_retry() {
    let sleeper = RecordingSleeper::default();
    let mut store = MockFoundingCounterStore::new();
    store
        .expect_transact()
        .times(1)
        .return_once(|_| Err(CounterStoreError::query("relation missing")));
    let allocator = allocator(store, sleeper.clone());

    let err = allocator.allocate().await.expect_err("allocation must fail");

    assert_eq!(err.attempts, 1);
    assert!(sleeper.calls().is_empty());
}

#[rstest]
#[case(None, "#142 / 200 claimed")]
#[case(Some(144), "#144 / 200 claimed")]
#[tokio::test]
async fn tally_shows_baseline_until_first_allocation(
    #[case] current: Option<u64>,
    #[case] expected: &str,
) {
    let mut store = MockFoundingCounterStore::new();
    store
        .expect_current()
        .times(1)
        .return_once(move || Ok(current));
    let allocator = allocator(store, RecordingSleeper::default());

    let tally = allocator.tally().await.expect("tally succeeds");

    assert_eq!(tally.to_string(), expected);
}
