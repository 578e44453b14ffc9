//! PostgreSQL-backed `ProfileRepository` implementation using Diesel ORM.
//!
//! A merge runs inside one transaction: ensure the row exists, lock it with
//! `SELECT ... FOR UPDATE`, apply the patch with the domain merge rules and
//! write the result back. Committed snapshots are published on a
//! process-local change feed so every session in the process sees them.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tokio::sync::watch;

use crate::domain::ports::{ProfileRepository, ProfileRepositoryError};
use crate::domain::{
    Email, FoundingMemberNumber, MembershipStatus, Profile, ProfilePatch, QualificationAnswers,
    UserId,
};
use crate::outbound::change_feed::ChangeFeed;

use super::diesel_error_mapping::map_diesel_error;
use super::models::MemberProfileRow;
use super::pool::{DbPool, PoolError};
use super::schema::member_profiles;

/// Diesel-backed implementation of the `ProfileRepository` port.
#[derive(Clone)]
pub struct DieselProfileRepository {
    pool: DbPool,
    feed: Arc<ChangeFeed<UserId, Profile>>,
}

impl DieselProfileRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            feed: Arc::new(ChangeFeed::default()),
        }
    }
}

fn map_pool_error(error: &PoolError) -> ProfileRepositoryError {
    ProfileRepositoryError::connection(error.message())
}

/// Failure inside the merge transaction.
#[derive(Debug)]
enum MergeTxError {
    Diesel(DieselError),
    Rejected(ProfileRepositoryError),
}

impl From<DieselError> for MergeTxError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl From<MergeTxError> for ProfileRepositoryError {
    fn from(value: MergeTxError) -> Self {
        match value {
            MergeTxError::Diesel(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Self::conflict("founding member number is already assigned to another profile")
            }
            MergeTxError::Diesel(error) => map_diesel_error(&error, Self::query, Self::connection),
            MergeTxError::Rejected(error) => error,
        }
    }
}

/// Convert a database row into a domain profile.
fn row_to_profile(row: MemberProfileRow) -> Result<Profile, ProfileRepositoryError> {
    let MemberProfileRow {
        user_id,
        email,
        status,
        founding_member_number,
        member_since,
        flexible_dates,
        flexible_destination,
        qualification_completed_at,
        payment_reference,
        created_at,
    } = row;

    let status = MembershipStatus::parse(&status).ok_or_else(|| {
        ProfileRepositoryError::query(format!("unrecognised membership status {status:?}"))
    })?;
    let founding_member_number = founding_member_number
        .map(|raw| {
            u64::try_from(raw)
                .ok()
                .and_then(FoundingMemberNumber::new)
                .ok_or_else(|| {
                    ProfileRepositoryError::query(format!("invalid founding member number {raw}"))
                })
        })
        .transpose()?;
    let email = email
        .map(Email::new)
        .transpose()
        .map_err(|err| ProfileRepositoryError::query(format!("stored email invalid: {err}")))?;
    let qualification = match (flexible_dates, flexible_destination, qualification_completed_at) {
        (Some(flexible_dates), Some(flexible_destination), Some(completed_at)) => {
            Some(QualificationAnswers {
                flexible_dates,
                flexible_destination,
                completed_at,
            })
        }
        _ => None,
    };

    let patch = ProfilePatch {
        email,
        status: Some(status),
        founding_member_number,
        member_since,
        qualification,
        payment_reference,
        created_at,
    };
    Profile::from_patch(UserId::from_uuid(user_id), &patch)
        .map_err(|err| ProfileRepositoryError::query(format!("stored profile inconsistent: {err}")))
}

/// Convert a domain profile into a row for upserting.
fn profile_to_row(profile: &Profile) -> Result<MemberProfileRow, ProfileRepositoryError> {
    let founding_member_number = profile
        .founding_member_number()
        .map(|number| {
            i64::try_from(number.get()).map_err(|_| {
                ProfileRepositoryError::query(format!("founding member number {number} too large"))
            })
        })
        .transpose()?;
    let qualification = profile.qualification();

    Ok(MemberProfileRow {
        user_id: *profile.user_id().as_uuid(),
        email: profile.email().map(|email| email.as_ref().to_owned()),
        status: profile.status().as_str().to_owned(),
        founding_member_number,
        member_since: profile.member_since(),
        flexible_dates: qualification.map(|answers| answers.flexible_dates),
        flexible_destination: qualification.map(|answers| answers.flexible_destination),
        qualification_completed_at: qualification.map(|answers| answers.completed_at),
        payment_reference: profile.payment_reference().map(str::to_owned),
        created_at: profile.created_at(),
    })
}

#[async_trait]
impl ProfileRepository for DieselProfileRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let row: Option<MemberProfileRow> = member_profiles::table
            .filter(member_profiles::user_id.eq(user_id.as_uuid()))
            .select(MemberProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| {
                map_diesel_error(
                    &err,
                    ProfileRepositoryError::query,
                    ProfileRepositoryError::connection,
                )
            })?;

        row.map(row_to_profile).transpose()
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Profile, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;
        let key = *user_id.as_uuid();
        let placeholder = profile_to_row(&Profile::empty(user_id.clone()))?;
        let patch = patch.clone();

        let merged = conn
            .transaction(|conn| {
                async move {
                    diesel::insert_into(member_profiles::table)
                        .values(&placeholder)
                        .on_conflict(member_profiles::user_id)
                        .do_nothing()
                        .execute(conn)
                        .await?;

                    let current: MemberProfileRow = member_profiles::table
                        .filter(member_profiles::user_id.eq(key))
                        .select(MemberProfileRow::as_select())
                        .for_update()
                        .first(conn)
                        .await?;

                    let mut profile = row_to_profile(current).map_err(MergeTxError::Rejected)?;
                    profile
                        .apply(&patch)
                        .map_err(|err| MergeTxError::Rejected(err.into()))?;
                    let row = profile_to_row(&profile).map_err(MergeTxError::Rejected)?;

                    diesel::update(member_profiles::table.find(key))
                        .set((&row, member_profiles::updated_at.eq(diesel::dsl::now)))
                        .execute(conn)
                        .await?;

                    Ok::<_, MergeTxError>(profile)
                }
                .scope_boxed()
            })
            .await
            .map_err(ProfileRepositoryError::from)?;

        self.feed.publish(user_id, merged.clone());
        Ok(merged)
    }

    fn watch(&self, user_id: &UserId) -> watch::Receiver<Option<Profile>> {
        self.feed.subscribe(user_id)
    }
}
