//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{founding_counters, member_profiles};

/// Row struct for reading from and upserting into `member_profiles`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = member_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(primary_key(user_id))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MemberProfileRow {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub status: String,
    pub founding_member_number: Option<i64>,
    pub member_since: Option<DateTime<Utc>>,
    pub flexible_dates: Option<bool>,
    pub flexible_destination: Option<bool>,
    pub qualification_completed_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Insertable struct for creating a counter row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = founding_counters)]
pub(crate) struct NewFoundingCounterRow<'a> {
    pub name: &'a str,
    pub value: i64,
}
