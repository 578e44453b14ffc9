//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `gateway/migrations`
//! exactly. Regenerate with `diesel print-schema` when a migration changes.

diesel::table! {
    /// Membership profiles, one row per identity.
    ///
    /// `founding_member_number` is unique and is present exactly when
    /// `status` is `active`.
    member_profiles (user_id) {
        /// Primary key: identity provider user id.
        user_id -> Uuid,
        /// Account email captured at activation.
        email -> Nullable<Varchar>,
        /// `none` or `active`.
        status -> Varchar,
        /// Founding rank; unique across profiles.
        founding_member_number -> Nullable<Int8>,
        /// Activation timestamp.
        member_since -> Nullable<Timestamptz>,
        /// Fit-check answer: flexible on dates.
        flexible_dates -> Nullable<Bool>,
        /// Fit-check answer: flexible on destination.
        flexible_destination -> Nullable<Bool>,
        /// When the fit check was completed.
        qualification_completed_at -> Nullable<Timestamptz>,
        /// Payment processor customer reference.
        payment_reference -> Nullable<Varchar>,
        /// First-write timestamp.
        created_at -> Nullable<Timestamptz>,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Named monotonic counters; the founding counter is a single row.
    founding_counters (name) {
        /// Counter name.
        name -> Varchar,
        /// Last committed value.
        value -> Int8,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}
