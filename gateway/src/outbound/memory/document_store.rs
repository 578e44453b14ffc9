//! In-process document store backing profiles and the founding counter.
//!
//! Profiles are merged under a write lock, so each merge is all-or-nothing.
//! The counter has a single writer: a transaction reads, updates and commits
//! under one lock acquisition and never suspends in between, so concurrent
//! transactions serialise instead of conflicting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

use crate::domain::ports::{
    CounterStoreError, CounterUpdate, FoundingCounterStore, ProfileRepository,
    ProfileRepositoryError,
};
use crate::domain::{Profile, ProfilePatch, UserId};
use crate::outbound::change_feed::ChangeFeed;

/// Shared in-memory store.
///
/// Implements both [`ProfileRepository`] and [`FoundingCounterStore`]; wrap
/// it in an `Arc` and hand clones to each service.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    profiles: RwLock<HashMap<UserId, Profile>>,
    profile_feed: ChangeFeed<UserId, Profile>,
    counter: Mutex<Option<u64>>,
    counter_feed: watch::Sender<Option<u64>>,
    failing_merges: AtomicU32,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            profile_feed: ChangeFeed::default(),
            counter: Mutex::new(None),
            counter_feed: watch::Sender::new(None),
            failing_merges: AtomicU32::new(0),
        }
    }

    /// Make the next `count` profile merges fail with a connection error.
    pub fn fail_next_merges(&self, count: u32) {
        self.failing_merges.store(count, Ordering::SeqCst);
    }

    /// Every stored profile.
    pub async fn profiles(&self) -> Vec<Profile> {
        self.profiles.read().await.values().cloned().collect()
    }

    fn counter(&self) -> MutexGuard<'_, Option<u64>> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_injected_failure(&self) -> Result<(), ProfileRepositoryError> {
        let injected = self
            .failing_merges
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if injected {
            return Err(ProfileRepositoryError::connection("document store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryDocumentStore {
    async fn find(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Profile, ProfileRepositoryError> {
        self.take_injected_failure()?;
        let mut profiles = self.profiles.write().await;
        let mut profile = profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| Profile::empty(user_id.clone()));
        profile.apply(patch)?;
        profiles.insert(user_id.clone(), profile.clone());
        self.profile_feed.publish(user_id, profile.clone());
        Ok(profile)
    }

    fn watch(&self, user_id: &UserId) -> watch::Receiver<Option<Profile>> {
        self.profile_feed.subscribe(user_id)
    }
}

#[async_trait]
impl FoundingCounterStore for MemoryDocumentStore {
    async fn transact(&self, update: CounterUpdate) -> Result<u64, CounterStoreError> {
        let mut value = self.counter();
        let next = update(*value);
        *value = Some(next);
        self.counter_feed.send_replace(Some(next));
        Ok(next)
    }

    async fn current(&self) -> Result<Option<u64>, CounterStoreError> {
        Ok(*self.counter())
    }

    fn watch(&self) -> watch::Receiver<Option<u64>> {
        self.counter_feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use rstest::rstest;

    use crate::domain::{FoundingMemberNumber, MembershipStatus, QualificationAnswers};

    fn increment() -> CounterUpdate {
        Arc::new(|current| current.unwrap_or(142) + 1)
    }

    #[tokio::test]
    async fn first_transaction_creates_and_increments() {
        let store = MemoryDocumentStore::new();
        assert_eq!(store.current().await.expect("read"), None);

        let value = store.transact(increment()).await.expect("commit");

        assert_eq!(value, 143);
        assert_eq!(store.current().await.expect("read"), Some(143));
        assert_eq!(*FoundingCounterStore::watch(&store).borrow(), Some(143));
    }

    #[tokio::test]
    async fn interleaved_transactions_never_lose_updates() {
        let store = MemoryDocumentStore::new();

        let (first, second) = tokio::join!(store.transact(increment()), store.transact(increment()));

        let mut values = vec![first.expect("commit"), second.expect("commit")];
        values.sort_unstable();
        assert_eq!(values, vec![143, 144]);
        assert_eq!(store.current().await.expect("read"), Some(144));
    }

    #[rstest]
    #[case(500)]
    #[case(2_000)]
    #[tokio::test(flavor = "current_thread")]
    async fn heavy_single_threaded_contention_commits_every_transaction(#[case] writers: u64) {
        let store = MemoryDocumentStore::new();

        let results = futures::future::join_all(
            (0..writers).map(|_| store.transact(increment())),
        )
        .await;

        let mut values: Vec<u64> = results
            .into_iter()
            .map(|result| result.expect("commit"))
            .collect();
        values.sort_unstable();
        assert_eq!(values, (143..=142 + writers).collect::<Vec<_>>());
        assert_eq!(store.current().await.expect("read"), Some(142 + writers));
    }

    #[tokio::test]
    async fn merges_keep_fields_from_both_writers() {
        let store = MemoryDocumentStore::new();
        let user = UserId::random();
        let now = Utc::now();
        let answers = QualificationAnswers {
            flexible_dates: true,
            flexible_destination: true,
            completed_at: now,
        };
        let number = FoundingMemberNumber::new(143).expect("positive");

        store
            .merge(&user, &ProfilePatch::qualification(answers))
            .await
            .expect("qualification merge");
        let merged = store
            .merge(&user, &ProfilePatch::activation(number, now))
            .await
            .expect("activation merge");

        assert_eq!(merged.status(), MembershipStatus::Active);
        assert_eq!(merged.founding_member_number(), Some(number));
        assert_eq!(merged.qualification(), Some(&answers));
        assert_eq!(store.find(&user).await.expect("read"), Some(merged));
    }

    #[tokio::test]
    async fn merge_notifies_watchers() {
        let store = MemoryDocumentStore::new();
        let user = UserId::random();
        let mut rx = ProfileRepository::watch(&store, &user);
        let number = FoundingMemberNumber::new(143).expect("positive");

        store
            .merge(&user, &ProfilePatch::activation(number, Utc::now()))
            .await
            .expect("merge");

        rx.changed().await.expect("feed alive");
        let seen = rx.borrow_and_update().clone().expect("snapshot");
        assert!(seen.is_active());
    }

    #[tokio::test]
    async fn rejected_merge_leaves_profile_untouched() {
        let store = MemoryDocumentStore::new();
        let user = UserId::random();
        let first = FoundingMemberNumber::new(143).expect("positive");
        let second = FoundingMemberNumber::new(144).expect("positive");
        let original = store
            .merge(&user, &ProfilePatch::activation(first, Utc::now()))
            .await
            .expect("merge");

        let err = store
            .merge(&user, &ProfilePatch::activation(second, Utc::now()))
            .await
            .expect_err("number change must be rejected");

        assert!(matches!(err, ProfileRepositoryError::Conflict { .. }));
        assert_eq!(store.find(&user).await.expect("read"), Some(original));
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[tokio::test]
    async fn injected_failures_are_consumed(#[case] failures: u32, #[case] first_fails: bool) {
        let store = MemoryDocumentStore::new();
        store.fail_next_merges(failures);
        let user = UserId::random();
        let patch = ProfilePatch::default();

        let first = store.merge(&user, &patch).await;
        let second = store.merge(&user, &patch).await;

        assert_eq!(first.is_err(), first_fails);
        assert!(second.is_ok());
    }
}
