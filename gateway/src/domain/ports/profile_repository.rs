//! Port for membership profile persistence.
//!
//! The [`ProfileRepository`] stores one [`Profile`] per identity. Writes are
//! merges: adapters apply a [`ProfilePatch`] with [`Profile::apply`] inside a
//! single atomic unit, so a merge is either fully visible or not at all.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{Profile, ProfileMergeError, ProfilePatch, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by profile repository adapters.
    pub enum ProfileRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } as ServiceUnavailable =>
            "profile repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } as InternalError =>
            "profile repository query failed: {message}",
        /// The patch violated a profile invariant.
        Conflict { message: String } as Conflict =>
            "profile merge rejected: {message}",
    }
}

impl From<ProfileMergeError> for ProfileRepositoryError {
    fn from(value: ProfileMergeError) -> Self {
        Self::conflict(value.to_string())
    }
}

/// Port for profile reads, merge writes and change notification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile for `user_id`; `None` when it was never written.
    async fn find(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError>;

    /// Merge `patch` into the stored profile, creating it when absent.
    ///
    /// Returns the merged profile as committed.
    async fn merge(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Profile, ProfileRepositoryError>;

    /// Subscribe to committed snapshots of one profile.
    ///
    /// The receiver is notified after every successful merge, from any
    /// session, and never needs polling.
    fn watch(&self, user_id: &UserId) -> watch::Receiver<Option<Profile>>;
}

/// Fixture repository that never stores anything.
///
/// Merges return the patch applied to an empty profile. Use it where profile
/// persistence is not under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProfileRepository;

#[async_trait]
impl ProfileRepository for FixtureProfileRepository {
    async fn find(&self, _user_id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError> {
        Ok(None)
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Profile, ProfileRepositoryError> {
        Ok(Profile::from_patch(user_id.clone(), patch)?)
    }

    fn watch(&self, _user_id: &UserId) -> watch::Receiver<Option<Profile>> {
        watch::channel(None).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FoundingMemberNumber, MembershipStatus};
    use chrono::Utc;
    use rstest::rstest;

    #[tokio::test]
    async fn fixture_repository_lookup_returns_none() {
        let repo = FixtureProfileRepository;
        let found = repo
            .find(&UserId::random())
            .await
            .expect("fixture lookup should succeed");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn fixture_repository_merge_applies_patch() {
        let repo = FixtureProfileRepository;
        let number = FoundingMemberNumber::new(143).expect("positive");
        let merged = repo
            .merge(&UserId::random(), &ProfilePatch::activation(number, Utc::now()))
            .await
            .expect("fixture merge should succeed");
        assert_eq!(merged.status(), MembershipStatus::Active);
    }

    #[rstest]
    fn merge_errors_map_to_conflict() {
        let err = ProfileRepositoryError::from(ProfileMergeError::StatusRegression);
        assert!(matches!(err, ProfileRepositoryError::Conflict { .. }));
        assert!(err.to_string().contains("cannot revert"));
    }
}
